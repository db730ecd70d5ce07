//! Match coordinator: room join arbitration, the match lifecycle, answer
//! intake, round advancement, and completion.
//!
//! Events for one room are serialized around its session mutex; rooms are
//! fully independent. The only cross-process hazard, two joiners racing for
//! slot B, is settled by the store's conditional write rather than any
//! in-process lock.

use std::{cmp::Ordering, sync::Arc};

use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{RoomEntity, RoomStatus},
    },
    dto::{
        room::RoomSnapshot,
        validation::validate_room_code,
        ws::{MatchWinner, QuestionView, ScoreBoard, ServerMessage},
    },
    error::ServiceError,
    state::{
        SharedState,
        hub::EventSender,
        session::{MatchSession, RoundAdvance, Scores},
    },
};

/// Handle a `join_room` event.
///
/// The owner re-joining is idempotent: their channel is re-attached and they
/// are told to keep waiting. Anyone else claims slot B through the store's
/// conditional write; losing that race reads as a full room.
pub async fn join_room(
    state: &SharedState,
    code: &str,
    participant: Uuid,
    tx: EventSender,
) -> Result<(), ServiceError> {
    if validate_room_code(code).is_err() {
        return Err(ServiceError::RoomNotFound);
    }
    let store = state.require_store().await?;
    let Some(room) = store.find_room(code).await? else {
        return Err(ServiceError::RoomNotFound);
    };

    if room.slot_a == participant {
        state.hub().attach(code, participant, tx);
        state.hub().send_to(
            code,
            participant,
            ServerMessage::Waiting {
                message: "Waiting for opponent to join".into(),
            },
        );
        info!(%code, %participant, "owner re-joined room");
        return Ok(());
    }

    if room.slot_b.is_some() {
        return Err(ServiceError::RoomFull);
    }

    if !store.fill_slot_b(code, participant).await? {
        warn!(%code, "join failed: guest slot already taken");
        return Err(ServiceError::RoomFull);
    }

    let Some(updated) = store.find_room(code).await? else {
        return Err(ServiceError::RoomNotFound);
    };

    state.hub().attach(code, participant, tx);
    let ready = ServerMessage::RoomReady {
        message: "Both players connected - game can start".into(),
        room: RoomSnapshot::from(updated),
    };
    // The joiner hears first, then the occupants already in the room.
    state.hub().send_to(code, participant, ready.clone());
    state.hub().broadcast_excluding(code, participant, ready);

    info!(%code, %participant, "participant joined room");
    Ok(())
}

/// Handle a `game_start` event.
///
/// The status compare-and-set is the arbiter between concurrent starters;
/// the question fetch happens before it, outside every lock, and is the one
/// supply call the match ever makes.
pub async fn start_match(state: &SharedState, code: &str) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let Some(room) = store.find_room(code).await? else {
        return Err(ServiceError::RoomNotFound);
    };
    if room.status != RoomStatus::Waiting {
        return Err(ServiceError::AlreadyStarted);
    }

    let questions = state.supply().fetch_questions().await?;
    let first_view = match questions.first() {
        Some(first) => QuestionView::redact(first),
        None => return Err(ServiceError::QuestionNotFound),
    };

    if !store
        .update_status(code, RoomStatus::Waiting, RoomStatus::Started)
        .await?
    {
        return Err(ServiceError::AlreadyStarted);
    }

    if !state
        .sessions()
        .insert_new(code, MatchSession::new(questions))
    {
        // A session under this code means a starter raced us past the CAS.
        return Err(ServiceError::AlreadyStarted);
    }

    state.hub().broadcast(
        code,
        ServerMessage::GameStarted {
            question: first_view,
            question_number: 1,
            scores: ScoreBoard {
                slot_a: 0,
                slot_b: 0,
            },
        },
    );

    info!(%code, "match started");
    Ok(())
}

/// Handle a `submit_answer` event.
///
/// A participant occupying neither slot is acknowledged but cannot affect
/// game state. Everything that reads or writes the session happens under its
/// mutex, including discarding it when the final round closes, so a stale
/// answer can never be counted against the wrong round.
pub async fn submit_answer(
    state: &SharedState,
    code: &str,
    participant: Uuid,
    answer: &str,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let Some(room) = store.find_room(code).await? else {
        return Err(ServiceError::RoomNotFound);
    };
    if room.status == RoomStatus::Waiting {
        return Err(ServiceError::GameNotStarted);
    }
    let Some(session) = state.sessions().get(code) else {
        return Err(ServiceError::GameNotFound);
    };

    let Some(slot) = room.slot_of(participant) else {
        let guard = session.lock().await;
        let (is_correct, correct_answer) = guard.check_answer(answer)?;
        drop(guard);
        state.hub().send_to(
            code,
            participant,
            ServerMessage::Answered {
                is_correct,
                correct_answer,
            },
        );
        return Ok(());
    };

    let mut guard = session.lock().await;
    let record = guard.record_answer(slot, answer)?;
    if matches!(record.round, Some(RoundAdvance::Completed { .. })) {
        // Discard before releasing the lock so no further answer slips in.
        state.sessions().remove(code);
    }
    drop(guard);

    state.hub().send_to(
        code,
        participant,
        ServerMessage::Answered {
            is_correct: record.correct,
            correct_answer: record.correct_answer,
        },
    );

    match record.round {
        None => {}
        Some(RoundAdvance::NextQuestion { scores, next_index }) => {
            state.hub().broadcast(
                code,
                ServerMessage::ScoresUpdated {
                    scores: scores.into(),
                },
            );
            schedule_next_question(state.clone(), code.to_owned(), next_index);
        }
        Some(RoundAdvance::Completed { scores }) => {
            state.hub().broadcast(
                code,
                ServerMessage::ScoresUpdated {
                    scores: scores.into(),
                },
            );
            complete_match(state, store, &room, scores).await;
        }
    }

    Ok(())
}

/// Wrap up a finished match: reconcile both high scores, mark the room
/// finished, and broadcast the single game-over notification.
async fn complete_match(
    state: &SharedState,
    store: Arc<dyn MatchStore>,
    room: &RoomEntity,
    scores: Scores,
) {
    let winner = determine_winner(room, scores);

    // Raise-only updates, independent of each other and best-effort: a
    // store failure here is logged and never holds up the result delivery.
    let guest = room.slot_b;
    tokio::join!(
        reconcile_high_score(&store, room.slot_a, scores.slot_a),
        async {
            if let Some(id) = guest {
                reconcile_high_score(&store, id, scores.slot_b).await;
            }
        },
    );

    match store
        .update_status(&room.code, RoomStatus::Started, RoomStatus::Finished)
        .await
    {
        Ok(true) => {}
        Ok(false) => warn!(code = %room.code, "room status moved while finishing the match"),
        Err(err) => warn!(code = %room.code, error = %err, "failed to persist finished status"),
    }

    state.hub().broadcast(
        &room.code,
        ServerMessage::GameOver {
            scores: scores.into(),
            winner: winner.clone(),
        },
    );

    info!(code = %room.code, ?winner, "match finished");
}

async fn reconcile_high_score(store: &Arc<dyn MatchStore>, participant: Uuid, score: u32) {
    match store.raise_high_score(participant, score).await {
        Ok(true) => info!(%participant, score, "new personal best recorded"),
        Ok(false) => {}
        Err(err) => warn!(%participant, error = %err, "failed to reconcile high score"),
    }
}

/// Strictly higher score wins; equal scores are an explicit tie, never a
/// participant id.
fn determine_winner(room: &RoomEntity, scores: Scores) -> MatchWinner {
    match (scores.slot_a.cmp(&scores.slot_b), room.slot_b) {
        (Ordering::Greater, _) => MatchWinner::Participant { id: room.slot_a },
        (Ordering::Less, Some(id)) => MatchWinner::Participant { id },
        _ => MatchWinner::Tie,
    }
}

/// Schedule the delayed `next_question` broadcast.
///
/// Pacing only: nothing blocks on the delay, no lock is held across it, and
/// the callback re-validates that the session still exists and still sits at
/// `expected_index` before firing. A discarded session turns it into a
/// no-op.
fn schedule_next_question(state: SharedState, code: String, expected_index: usize) {
    let delay = state.config().round_delay();
    tokio::spawn(async move {
        sleep(delay).await;

        let Some(session) = state.sessions().get(&code) else {
            return;
        };
        let guard = session.lock().await;
        if guard.current_index() != expected_index {
            return;
        }
        let Some(question) = guard.current_question() else {
            return;
        };
        let message = ServerMessage::NextQuestion {
            question: QuestionView::redact(question),
            question_number: expected_index + 1,
            total_questions: guard.total_questions(),
        };
        drop(guard);

        state.hub().broadcast(&code, message);
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{match_store::memory::MemoryMatchStore, models::ParticipantEntity},
        questions::{FixedQuestionSupply, Question},
        services::auth_service::TokenSigner,
        state::AppState,
    };

    const ROUND_DELAY: Duration = Duration::from_millis(50);

    fn question(prompt: &str, correct: &str) -> Question {
        Question {
            prompt: prompt.into(),
            correct_answer: correct.into(),
            distractors: vec!["Madrid".into(), "Berlin".into(), "Lisbon".into()],
        }
    }

    fn paris_rome_questions() -> Vec<Question> {
        vec![
            question("Capital of France?", "Paris"),
            question("Capital of Italy?", "Rome"),
        ]
    }

    struct Fixture {
        state: SharedState,
        store: MemoryMatchStore,
        owner: Uuid,
        guest: Uuid,
        code: String,
    }

    /// Bring up a state with a waiting room, two registered participants,
    /// and channels attached for both.
    async fn fixture(questions: Vec<Question>) -> (Fixture, Receivers) {
        let store = MemoryMatchStore::new();
        let state = AppState::new(
            AppConfig::for_tests(ROUND_DELAY),
            Arc::new(FixedQuestionSupply::new(questions)),
            TokenSigner::new(b"test-secret".to_vec(), Duration::from_secs(60)),
        );
        state.install_store(Arc::new(store.clone())).await;

        let owner = Uuid::new_v4();
        let guest = Uuid::new_v4();
        for (id, email) in [(owner, "owner@example.com"), (guest, "guest@example.com")] {
            store
                .insert_participant(ParticipantEntity {
                    id,
                    name: "player".into(),
                    email: email.into(),
                    password_hash: String::new(),
                    highest_score: 0,
                    created_at: std::time::SystemTime::now(),
                })
                .await
                .unwrap();
        }

        let code = "123456".to_string();
        store
            .insert_room(RoomEntity::new(code.clone(), owner))
            .await
            .unwrap();

        let (owner_tx, owner_rx) = mpsc::unbounded_channel();
        let (guest_tx, guest_rx) = mpsc::unbounded_channel();

        join_room(&state, &code, owner, owner_tx).await.unwrap();
        join_room(&state, &code, guest, guest_tx).await.unwrap();

        (
            Fixture {
                state,
                store,
                owner,
                guest,
                code,
            },
            Receivers {
                owner: owner_rx,
                guest: guest_rx,
            },
        )
    }

    struct Receivers {
        owner: mpsc::UnboundedReceiver<ServerMessage>,
        guest: mpsc::UnboundedReceiver<ServerMessage>,
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn owner_rejoin_is_idempotent() {
        let (fx, mut rx) = fixture(paris_rome_questions()).await;

        let (tx, mut again_rx) = mpsc::unbounded_channel();
        join_room(&fx.state, &fx.code, fx.owner, tx).await.unwrap();

        let events = drain(&mut again_rx);
        assert!(matches!(events[0], ServerMessage::Waiting { .. }));

        // Slot B still belongs to the original guest.
        let room = fx.store.find_room(&fx.code).await.unwrap().unwrap();
        assert_eq!(room.slot_b, Some(fx.guest));
        drain(&mut rx.owner);
    }

    #[tokio::test]
    async fn join_notifies_joiner_then_rest_of_room() {
        let (_fx, mut rx) = fixture(paris_rome_questions()).await;

        let guest_events = drain(&mut rx.guest);
        assert!(matches!(guest_events[0], ServerMessage::RoomReady { .. }));

        let owner_events = drain(&mut rx.owner);
        assert!(
            owner_events
                .iter()
                .any(|event| matches!(event, ServerMessage::RoomReady { .. }))
        );
    }

    #[tokio::test]
    async fn join_into_unknown_room_fails() {
        let (fx, _rx) = fixture(paris_rome_questions()).await;
        let (tx, _extra_rx) = mpsc::unbounded_channel();
        let err = join_room(&fx.state, "999999", Uuid::new_v4(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoomNotFound));
    }

    #[tokio::test]
    async fn third_participant_sees_room_full() {
        let (fx, _rx) = fixture(paris_rome_questions()).await;
        let (tx, _extra_rx) = mpsc::unbounded_channel();
        let err = join_room(&fx.state, &fx.code, Uuid::new_v4(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoomFull));
    }

    #[tokio::test]
    async fn simultaneous_joins_leave_exactly_one_occupant() {
        let store = MemoryMatchStore::new();
        let state = AppState::new(
            AppConfig::for_tests(ROUND_DELAY),
            Arc::new(FixedQuestionSupply::new(paris_rome_questions())),
            TokenSigner::new(b"test-secret".to_vec(), Duration::from_secs(60)),
        );
        state.install_store(Arc::new(store.clone())).await;

        let owner = Uuid::new_v4();
        store
            .insert_room(RoomEntity::new("777777".into(), owner))
            .await
            .unwrap();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let (first_tx, _first_rx) = mpsc::unbounded_channel();
        let (second_tx, _second_rx) = mpsc::unbounded_channel();

        let (a, b) = tokio::join!(
            join_room(&state, "777777", first, first_tx),
            join_room(&state, "777777", second, second_tx),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|result| matches!(result, Err(ServiceError::RoomFull)))
        );

        let room = store.find_room("777777").await.unwrap().unwrap();
        let occupant = room.slot_b.unwrap();
        assert!(occupant == first || occupant == second);
    }

    #[tokio::test]
    async fn start_broadcasts_redacted_first_question() {
        let (fx, mut rx) = fixture(paris_rome_questions()).await;
        drain(&mut rx.owner);
        drain(&mut rx.guest);

        start_match(&fx.state, &fx.code).await.unwrap();

        let events = drain(&mut rx.owner);
        let Some(ServerMessage::GameStarted {
            question,
            question_number,
            scores,
        }) = events.first()
        else {
            panic!("expected game_started, got {events:?}");
        };
        assert_eq!(question.prompt, "Capital of France?");
        assert!(question.choices.contains(&"Paris".to_string()));
        assert_eq!(*question_number, 1);
        assert_eq!(scores.slot_a, 0);
        assert_eq!(scores.slot_b, 0);

        let room = fx.store.find_room(&fx.code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Started);
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() {
        let (fx, _rx) = fixture(paris_rome_questions()).await;
        start_match(&fx.state, &fx.code).await.unwrap();
        let err = start_match(&fx.state, &fx.code).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyStarted));
    }

    #[tokio::test]
    async fn answering_before_start_is_rejected() {
        let (fx, _rx) = fixture(paris_rome_questions()).await;
        let err = submit_answer(&fx.state, &fx.code, fx.owner, "Paris")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::GameNotStarted));
    }

    #[tokio::test]
    async fn duplicate_answer_is_rejected_without_score_change() {
        let (fx, _rx) = fixture(paris_rome_questions()).await;
        start_match(&fx.state, &fx.code).await.unwrap();

        submit_answer(&fx.state, &fx.code, fx.owner, "Paris")
            .await
            .unwrap();
        let err = submit_answer(&fx.state, &fx.code, fx.owner, "Paris")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyAnswered));

        let session = fx.state.sessions().get(&fx.code).unwrap();
        let guard = session.lock().await;
        assert_eq!(guard.scores().slot_a, 1);
        assert_eq!(guard.current_index(), 0);
    }

    #[tokio::test]
    async fn unrecognized_participant_is_acknowledged_but_never_scored() {
        let (fx, _rx) = fixture(paris_rome_questions()).await;
        start_match(&fx.state, &fx.code).await.unwrap();

        let outsider = Uuid::new_v4();
        let (tx, mut outsider_rx) = mpsc::unbounded_channel();
        fx.state.hub().attach(&fx.code, outsider, tx);

        submit_answer(&fx.state, &fx.code, outsider, "Paris")
            .await
            .unwrap();

        let events = drain(&mut outsider_rx);
        assert!(matches!(
            events[0],
            ServerMessage::Answered { is_correct: true, .. }
        ));

        let session = fx.state.sessions().get(&fx.code).unwrap();
        let guard = session.lock().await;
        assert_eq!(guard.scores().slot_a, 0);
        assert_eq!(guard.scores().slot_b, 0);
        assert_eq!(guard.current_index(), 0);
    }

    #[tokio::test]
    async fn full_match_flow_declares_the_winner() {
        let (fx, mut rx) = fixture(paris_rome_questions()).await;
        start_match(&fx.state, &fx.code).await.unwrap();
        drain(&mut rx.owner);
        drain(&mut rx.guest);

        // Round one: owner correct, guest wrong.
        submit_answer(&fx.state, &fx.code, fx.owner, "Paris")
            .await
            .unwrap();
        assert!(fx.state.sessions().get(&fx.code).is_some());
        submit_answer(&fx.state, &fx.code, fx.guest, "Lyon")
            .await
            .unwrap();

        let owner_events = drain(&mut rx.owner);
        let scores = owner_events
            .iter()
            .find_map(|event| match event {
                ServerMessage::ScoresUpdated { scores } => Some(*scores),
                _ => None,
            })
            .expect("scores_updated after the round closes");
        assert_eq!((scores.slot_a, scores.slot_b), (1, 0));

        // The next question arrives only after the pacing delay.
        assert!(drain(&mut rx.owner).is_empty());
        sleep(ROUND_DELAY * 3).await;
        let owner_events = drain(&mut rx.owner);
        let Some(ServerMessage::NextQuestion {
            question,
            question_number,
            total_questions,
        }) = owner_events.first()
        else {
            panic!("expected next_question, got {owner_events:?}");
        };
        assert_eq!(question.prompt, "Capital of Italy?");
        assert_eq!(*question_number, 2);
        assert_eq!(*total_questions, 2);

        // Round two: both correct.
        submit_answer(&fx.state, &fx.code, fx.owner, "Rome")
            .await
            .unwrap();
        submit_answer(&fx.state, &fx.code, fx.guest, "Rome")
            .await
            .unwrap();

        let guest_events = drain(&mut rx.guest);
        let game_over = guest_events
            .iter()
            .find_map(|event| match event {
                ServerMessage::GameOver { scores, winner } => Some((*scores, winner.clone())),
                _ => None,
            })
            .expect("game_over after the final round");
        assert_eq!((game_over.0.slot_a, game_over.0.slot_b), (2, 1));
        assert_eq!(game_over.1, MatchWinner::Participant { id: fx.owner });

        // Session discarded, room finished, high scores reconciled.
        assert!(fx.state.sessions().get(&fx.code).is_none());
        let room = fx.store.find_room(&fx.code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Finished);

        let owner_stored = fx.store.find_participant(fx.owner).await.unwrap().unwrap();
        let guest_stored = fx.store.find_participant(fx.guest).await.unwrap().unwrap();
        assert_eq!(owner_stored.highest_score, 2);
        assert_eq!(guest_stored.highest_score, 1);

        // Late answers observe the discarded session.
        let err = submit_answer(&fx.state, &fx.code, fx.owner, "Rome")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::GameNotFound));
    }

    #[tokio::test]
    async fn tied_match_reports_the_tie_marker() {
        let (fx, mut rx) = fixture(vec![question("Capital of France?", "Paris")]).await;
        start_match(&fx.state, &fx.code).await.unwrap();
        drain(&mut rx.owner);

        submit_answer(&fx.state, &fx.code, fx.owner, "Paris")
            .await
            .unwrap();
        submit_answer(&fx.state, &fx.code, fx.guest, "Paris")
            .await
            .unwrap();

        let events = drain(&mut rx.owner);
        let winner = events
            .iter()
            .find_map(|event| match event {
                ServerMessage::GameOver { winner, .. } => Some(winner.clone()),
                _ => None,
            })
            .expect("game_over after the only round");
        assert_eq!(winner, MatchWinner::Tie);
    }

    #[tokio::test]
    async fn persisted_high_scores_never_regress() {
        let (fx, _rx) = fixture(vec![question("Capital of France?", "Paris")]).await;
        // Owner already holds a better score from an earlier match.
        fx.store.raise_high_score(fx.owner, 9).await.unwrap();

        start_match(&fx.state, &fx.code).await.unwrap();
        submit_answer(&fx.state, &fx.code, fx.owner, "Paris")
            .await
            .unwrap();
        submit_answer(&fx.state, &fx.code, fx.guest, "Paris")
            .await
            .unwrap();

        let stored = fx.store.find_participant(fx.owner).await.unwrap().unwrap();
        assert_eq!(stored.highest_score, 9);
    }

    #[tokio::test]
    async fn stale_next_question_callback_is_a_no_op() {
        let (fx, mut rx) = fixture(paris_rome_questions()).await;
        start_match(&fx.state, &fx.code).await.unwrap();

        // Close round one, which schedules the delayed broadcast...
        submit_answer(&fx.state, &fx.code, fx.owner, "Paris")
            .await
            .unwrap();
        submit_answer(&fx.state, &fx.code, fx.guest, "Paris")
            .await
            .unwrap();
        // ...then finish the match before the delay elapses.
        submit_answer(&fx.state, &fx.code, fx.owner, "Rome")
            .await
            .unwrap();
        submit_answer(&fx.state, &fx.code, fx.guest, "Rome")
            .await
            .unwrap();
        drain(&mut rx.owner);

        sleep(ROUND_DELAY * 3).await;
        let late = drain(&mut rx.owner);
        assert!(
            late.iter()
                .all(|event| !matches!(event, ServerMessage::NextQuestion { .. })),
            "discarded session must silence the scheduled broadcast: {late:?}"
        );
    }
}
