use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::dto::ws::ServerMessage;

/// Handle used to push events to one connected participant.
pub type EventSender = mpsc::UnboundedSender<ServerMessage>;

/// Per-room notification registry.
///
/// Maps a room code to the event channels of its connected participants and
/// offers unicast, broadcast, and broadcast-excluding fan-out. Delivery
/// failures (a participant that just disconnected) are ignored; the socket
/// handler detaches its entry on close.
#[derive(Default)]
pub struct RoomHub {
    rooms: DashMap<String, DashMap<Uuid, EventSender>>,
}

impl RoomHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `participant`'s event channel under `code`, replacing any
    /// previous channel for the same participant.
    pub fn attach(&self, code: &str, participant: Uuid, tx: EventSender) {
        self.rooms
            .entry(code.to_owned())
            .or_default()
            .insert(participant, tx);
    }

    /// Drop `participant`'s channel, removing the room group once empty.
    pub fn detach(&self, code: &str, participant: Uuid) {
        let emptied = match self.rooms.get(code) {
            Some(group) => {
                group.remove(&participant);
                group.is_empty()
            }
            None => false,
        };
        if emptied {
            self.rooms.remove_if(code, |_, group| group.is_empty());
        }
    }

    /// Send `event` to a single participant in `code`.
    pub fn send_to(&self, code: &str, participant: Uuid, event: ServerMessage) {
        if let Some(group) = self.rooms.get(code)
            && let Some(tx) = group.get(&participant)
        {
            let _ = tx.send(event);
        }
    }

    /// Send `event` to every participant connected to `code`.
    pub fn broadcast(&self, code: &str, event: ServerMessage) {
        if let Some(group) = self.rooms.get(code) {
            for entry in group.iter() {
                let _ = entry.value().send(event.clone());
            }
        }
    }

    /// Send `event` to everyone in `code` except `excluded`. Used when the
    /// triggering participant must observe their copy first.
    pub fn broadcast_excluding(&self, code: &str, excluded: Uuid, event: ServerMessage) {
        if let Some(group) = self.rooms.get(code) {
            for entry in group.iter() {
                if *entry.key() != excluded {
                    let _ = entry.value().send(event.clone());
                }
            }
        }
    }
}
