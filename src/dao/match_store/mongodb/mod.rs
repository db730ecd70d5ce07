mod error;
mod models;
pub mod store;

use crate::dao::match_store::StorageError;
pub use error::MongoDaoError;
pub use store::{MongoConfig, MongoMatchStore};

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
