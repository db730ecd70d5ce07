use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{ParticipantEntity, RoomEntity, RoomStatus};

/// Room record as persisted in the `rooms` collection. Participant ids are
/// stored as canonical UUID strings so conditional-update filters can match
/// them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDocument {
    #[serde(rename = "_id")]
    code: String,
    slot_a: String,
    slot_b: Option<String>,
    status: RoomStatus,
    created_at: DateTime,
}

impl From<RoomEntity> for RoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            code: value.code,
            slot_a: value.slot_a.to_string(),
            slot_b: value.slot_b.map(|id| id.to_string()),
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<RoomDocument> for RoomEntity {
    type Error = MongoDaoError;

    fn try_from(value: RoomDocument) -> MongoResult<Self> {
        let slot_a = parse_uuid(&value.slot_a, "room.slot_a")?;
        let slot_b = value
            .slot_b
            .as_deref()
            .map(|id| parse_uuid(id, "room.slot_b"))
            .transpose()?;
        Ok(Self {
            code: value.code,
            slot_a,
            slot_b,
            status: value.status,
            created_at: value.created_at.to_system_time(),
        })
    }
}

/// Participant record as persisted in the `participants` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password_hash: String,
    highest_score: u32,
    created_at: DateTime,
}

impl From<ParticipantEntity> for ParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            email: value.email,
            password_hash: value.password_hash,
            highest_score: value.highest_score,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<ParticipantDocument> for ParticipantEntity {
    type Error = MongoDaoError;

    fn try_from(value: ParticipantDocument) -> MongoResult<Self> {
        let id = parse_uuid(&value.id, "participant._id")?;
        Ok(Self {
            id,
            name: value.name,
            email: value.email,
            password_hash: value.password_hash,
            highest_score: value.highest_score,
            created_at: value.created_at.to_system_time(),
        })
    }
}

/// Wire value used when filtering on a status field.
pub fn status_str(status: RoomStatus) -> &'static str {
    match status {
        RoomStatus::Waiting => "WAITING",
        RoomStatus::Started => "STARTED",
        RoomStatus::Finished => "FINISHED",
    }
}

fn parse_uuid(raw: &str, context: &'static str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|source| MongoDaoError::Decode { context, source })
}
