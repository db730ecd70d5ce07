use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::ServiceError,
    services::match_service,
    state::SharedState,
};

/// Handle the full lifecycle of one participant WebSocket connection.
///
/// Outbound events flow through a dedicated writer task so broadcasts keep
/// moving while this loop awaits inbound frames. The same channel is what
/// the room hub holds once the socket joins a room.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(error = %err, "failed to serialize server event");
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // The room group this socket joined, if any; detached on disconnect.
    let mut membership: Option<(String, Uuid)> = None;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let inbound = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(inbound) => inbound,
                    Err(err) => {
                        warn!(error = %err, "failed to parse client message");
                        let _ = outbound_tx.send(ServerMessage::Error {
                            message: "Malformed message".into(),
                        });
                        continue;
                    }
                };
                dispatch(&state, inbound, &outbound_tx, &mut membership).await;
            }
            Ok(Message::Close(_)) => {
                break;
            }
            // Pings are answered by the protocol layer while we keep polling.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => {}
            Err(err) => {
                warn!(error = %err, "websocket error");
                break;
            }
        }
    }

    if let Some((code, participant)) = membership.take() {
        state.hub().detach(&code, participant);
        info!(%code, %participant, "participant disconnected");
    }

    finalize(writer_task, outbound_tx).await;
}

async fn dispatch(
    state: &SharedState,
    inbound: ClientMessage,
    outbound_tx: &mpsc::UnboundedSender<ServerMessage>,
    membership: &mut Option<(String, Uuid)>,
) {
    match inbound {
        ClientMessage::JoinRoom {
            code,
            participant_id,
        } => {
            // A socket belongs to at most one room group at a time.
            if let Some((old_code, old_participant)) = membership.take() {
                state.hub().detach(&old_code, old_participant);
            }
            match match_service::join_room(state, &code, participant_id, outbound_tx.clone()).await
            {
                Ok(()) => *membership = Some((code, participant_id)),
                Err(err) => send_failure(outbound_tx, err),
            }
        }
        ClientMessage::GameStart { code } => {
            if let Err(err) = match_service::start_match(state, &code).await {
                send_failure(outbound_tx, err);
            }
        }
        ClientMessage::SubmitAnswer {
            code,
            participant_id,
            answer,
        } => {
            if let Err(err) =
                match_service::submit_answer(state, &code, participant_id, &answer).await
            {
                send_failure(outbound_tx, err);
            }
        }
        ClientMessage::Unknown => {
            warn!("ignoring unknown client message");
        }
    }
}

/// Report a failed operation to the offending participant only. Other
/// participants and the rest of the room never observe it.
fn send_failure(tx: &mpsc::UnboundedSender<ServerMessage>, err: ServiceError) {
    let event = match &err {
        ServiceError::RoomFull => ServerMessage::RoomFull {
            message: err.to_string(),
        },
        _ if err.is_participant_visible() => ServerMessage::Error {
            message: err.to_string(),
        },
        _ => {
            error!(error = %err, "internal failure while handling participant event");
            ServerMessage::Error {
                message: "Internal error".into(),
            }
        }
    };
    let _ = tx.send(event);
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<ServerMessage>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
