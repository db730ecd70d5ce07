pub mod auth_service;
pub mod documentation;
pub mod match_service;
pub mod room_service;
pub mod storage_supervisor;
pub mod websocket_service;
