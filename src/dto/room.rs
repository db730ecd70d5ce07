use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{RoomEntity, RoomStatus};

/// Response to room creation.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRoomResponse {
    /// Code the opponent uses to join.
    pub code: String,
}

/// Projection of the room record shared with both participants.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSnapshot {
    /// Short room code.
    pub code: String,
    /// Participant occupying slot A.
    pub slot_a: Uuid,
    /// Participant occupying slot B, if joined.
    pub slot_b: Option<Uuid>,
    /// Current lifecycle status.
    pub status: RoomStatus,
}

impl From<RoomEntity> for RoomSnapshot {
    fn from(value: RoomEntity) -> Self {
        Self {
            code: value.code,
            slot_a: value.slot_a,
            slot_b: value.slot_b,
            status: value.status,
        }
    }
}
