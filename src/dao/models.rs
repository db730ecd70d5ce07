use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a room. Advances monotonically and never leaves
/// [`RoomStatus::Finished`]; a room is a single-use artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Room created, waiting for the second participant and the start event.
    Waiting,
    /// Match in progress; a live session exists for this room.
    Started,
    /// Match over; the room accepts no further events.
    Finished,
}

/// Error returned when a status would move backwards or skip a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition: {from:?} cannot advance to {to:?}")]
pub struct InvalidStatusTransition {
    /// Status the room currently holds.
    pub from: RoomStatus,
    /// Status the caller attempted to move to.
    pub to: RoomStatus,
}

impl RoomStatus {
    /// Validate a status advance, returning the new status when legal.
    pub fn advance(self, to: RoomStatus) -> Result<RoomStatus, InvalidStatusTransition> {
        match (self, to) {
            (RoomStatus::Waiting, RoomStatus::Started)
            | (RoomStatus::Started, RoomStatus::Finished) => Ok(to),
            (from, to) => Err(InvalidStatusTransition { from, to }),
        }
    }

    /// Whether no further transition can leave this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, RoomStatus::Finished)
    }
}

/// One of the two participant positions inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Position held by the room owner.
    A,
    /// Position claimed by the joining participant.
    B,
}

/// Pairing record for two participants, identified by a short numeric code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Short code participants use to find the room.
    pub code: String,
    /// Participant occupying slot A (the room owner).
    pub slot_a: Uuid,
    /// Participant occupying slot B, absent until someone joins.
    pub slot_b: Option<Uuid>,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

impl RoomEntity {
    /// Build a fresh waiting room owned by `owner`.
    pub fn new(code: String, owner: Uuid) -> Self {
        Self {
            code,
            slot_a: owner,
            slot_b: None,
            status: RoomStatus::Waiting,
            created_at: SystemTime::now(),
        }
    }

    /// Resolve which slot `participant` occupies, if any.
    pub fn slot_of(&self, participant: Uuid) -> Option<Slot> {
        if self.slot_a == participant {
            Some(Slot::A)
        } else if self.slot_b == Some(participant) {
            Some(Slot::B)
        } else {
            None
        }
    }
}

/// Registered participant with their persisted best score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Stable identifier handed out at registration.
    pub id: Uuid,
    /// Display name chosen at registration.
    pub name: String,
    /// Sign-in email, unique across participants.
    pub email: String,
    /// Salted PBKDF2 hash of the password.
    pub password_hash: String,
    /// Best final match score ever recorded; raise-only.
    pub highest_score: u32,
    /// Registration timestamp.
    pub created_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_advances_forward_only() {
        assert_eq!(
            RoomStatus::Waiting.advance(RoomStatus::Started),
            Ok(RoomStatus::Started)
        );
        assert_eq!(
            RoomStatus::Started.advance(RoomStatus::Finished),
            Ok(RoomStatus::Finished)
        );
    }

    #[test]
    fn status_never_moves_backward_or_skips() {
        assert!(RoomStatus::Started.advance(RoomStatus::Waiting).is_err());
        assert!(RoomStatus::Finished.advance(RoomStatus::Started).is_err());
        assert!(RoomStatus::Finished.advance(RoomStatus::Waiting).is_err());
        assert!(RoomStatus::Waiting.advance(RoomStatus::Finished).is_err());
        assert!(RoomStatus::Waiting.advance(RoomStatus::Waiting).is_err());
    }

    #[test]
    fn finished_is_the_only_terminal_status() {
        assert!(!RoomStatus::Waiting.is_terminal());
        assert!(!RoomStatus::Started.is_terminal());
        assert!(RoomStatus::Finished.is_terminal());
    }

    #[test]
    fn slot_resolution_matches_stored_ids() {
        let owner = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut room = RoomEntity::new("123456".into(), owner);

        assert_eq!(room.slot_of(owner), Some(Slot::A));
        assert_eq!(room.slot_of(guest), None);

        room.slot_b = Some(guest);
        assert_eq!(room.slot_of(guest), Some(Slot::B));
        assert_eq!(room.slot_of(Uuid::new_v4()), None);
    }
}
