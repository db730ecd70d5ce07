pub mod match_store;
pub mod models;
