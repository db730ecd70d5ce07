use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB-backed match store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert room `{code}`")]
    InsertRoom {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load room `{code}`")]
    LoadRoom {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to update room `{code}`")]
    UpdateRoom {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert participant `{id}`")]
    InsertParticipant {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load participant")]
    LoadParticipant {
        #[source]
        source: MongoError,
    },
    #[error("failed to update participant `{id}`")]
    UpdateParticipant {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("stored document for `{context}` holds a malformed identifier")]
    Decode {
        context: &'static str,
        #[source]
        source: uuid::Error,
    },
}
