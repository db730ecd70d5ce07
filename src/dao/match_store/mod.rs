pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{ParticipantEntity, RoomEntity, RoomStatus};

/// Result alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by store backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or the operation failed in transit.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the failed operation.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Abstraction over the durable room registry and participant store.
///
/// The two conditional writes (`fill_slot_b`, `update_status`,
/// `raise_high_score`) carry compare-and-set semantics: the backend applies
/// them atomically against its own copy of the record and reports whether the
/// caller's condition held. In-process locking is not enough because the
/// store may be shared across coordinator instances.
pub trait MatchStore: Send + Sync {
    /// Insert a freshly created room. Resolves to `false` when the code is
    /// already taken, which drives the create-retry loop.
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<bool>>;

    /// Look up a room by its code.
    fn find_room(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;

    /// Claim slot B for `participant` only while the slot is still absent.
    /// Resolves to `false` when another joiner won the race (or the room is
    /// gone), mirroring a zero-rows-affected conditional update.
    fn fill_slot_b(&self, code: &str, participant: Uuid)
    -> BoxFuture<'static, StorageResult<bool>>;

    /// Advance the room status only when it currently equals `from`.
    /// Resolves to `false` when the condition did not hold.
    fn update_status(
        &self,
        code: &str,
        from: RoomStatus,
        to: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert a new participant. Resolves to `false` when the email is
    /// already registered.
    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Look up a participant by id.
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;

    /// Look up a participant by sign-in email.
    fn find_participant_by_email(
        &self,
        email: &str,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;

    /// Raise the participant's stored best score to `score` only when it
    /// exceeds the current value. Resolves to `true` when the stored value
    /// moved. A stored high score never decreases through this call.
    fn raise_high_score(&self, id: Uuid, score: u32) -> BoxFuture<'static, StorageResult<bool>>;

    /// Ping the backend to confirm it is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
