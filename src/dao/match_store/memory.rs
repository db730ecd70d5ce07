use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use super::{MatchStore, StorageResult};
use crate::dao::models::{ParticipantEntity, RoomEntity, RoomStatus};

/// In-memory store used by tests and single-node deployments without a
/// database. Conditional writes rely on `DashMap` entry locks, so each
/// compare-and-set runs atomically with respect to concurrent callers.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    rooms: DashMap<String, RoomEntity>,
    participants: DashMap<Uuid, ParticipantEntity>,
    // Email uniqueness index; guards the insert race on duplicate signups.
    emails: DashMap<String, Uuid>,
}

impl MemoryMatchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for MemoryMatchStore {
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.rooms.entry(room.code.clone()) {
                Entry::Occupied(_) => Ok(false),
                Entry::Vacant(vacant) => {
                    vacant.insert(room);
                    Ok(true)
                }
            }
        })
    }

    fn find_room(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let inner = self.inner.clone();
        let code = code.to_owned();
        Box::pin(async move { Ok(inner.rooms.get(&code).map(|entry| entry.clone())) })
    }

    fn fill_slot_b(
        &self,
        code: &str,
        participant: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        let code = code.to_owned();
        Box::pin(async move {
            let Some(mut room) = inner.rooms.get_mut(&code) else {
                return Ok(false);
            };
            if room.slot_b.is_some() {
                return Ok(false);
            }
            room.slot_b = Some(participant);
            Ok(true)
        })
    }

    fn update_status(
        &self,
        code: &str,
        from: RoomStatus,
        to: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        let code = code.to_owned();
        Box::pin(async move {
            let Some(mut room) = inner.rooms.get_mut(&code) else {
                return Ok(false);
            };
            if room.status != from || from.advance(to).is_err() {
                return Ok(false);
            }
            room.status = to;
            Ok(true)
        })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.emails.entry(participant.email.clone()) {
                Entry::Occupied(_) => Ok(false),
                Entry::Vacant(vacant) => {
                    vacant.insert(participant.id);
                    inner.participants.insert(participant.id, participant);
                    Ok(true)
                }
            }
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.participants.get(&id).map(|entry| entry.clone())) })
    }

    fn find_participant_by_email(
        &self,
        email: &str,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let inner = self.inner.clone();
        let email = email.to_owned();
        Box::pin(async move {
            let Some(id) = inner.emails.get(&email).map(|entry| *entry) else {
                return Ok(None);
            };
            Ok(inner.participants.get(&id).map(|entry| entry.clone()))
        })
    }

    fn raise_high_score(&self, id: Uuid, score: u32) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let Some(mut participant) = inner.participants.get_mut(&id) else {
                return Ok(false);
            };
            if score <= participant.highest_score {
                return Ok(false);
            }
            participant.highest_score = score;
            Ok(true)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
