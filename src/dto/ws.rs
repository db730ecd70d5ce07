use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::room::RoomSnapshot, questions::Question, state::session::Scores};

/// Messages accepted from participant WebSocket clients.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join (or re-join, for the owner) the room identified by `code`.
    JoinRoom {
        /// Target room code.
        code: String,
        /// Stable id of the acting participant.
        participant_id: Uuid,
    },
    /// Start the match for a full room.
    GameStart {
        /// Target room code.
        code: String,
    },
    /// Submit the single answer for the current question.
    SubmitAnswer {
        /// Target room code.
        code: String,
        /// Stable id of the acting participant.
        participant_id: Uuid,
        /// Answer text, matched exactly.
        answer: String,
    },
    /// Anything this build does not understand; logged and ignored.
    #[serde(other)]
    Unknown,
}

/// Question projection pushed to clients, with answer fields stripped.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionView {
    /// Question text.
    pub prompt: String,
    /// Correct answer and distractors, shuffled together.
    pub choices: Vec<String>,
}

impl QuestionView {
    /// Redact `question` for the wire: keep the prompt, mix the correct
    /// answer in with the distractors.
    pub fn redact(question: &Question) -> Self {
        let mut choices = Vec::with_capacity(question.distractors.len() + 1);
        choices.push(question.correct_answer.clone());
        choices.extend(question.distractors.iter().cloned());
        choices.shuffle(&mut rand::rng());
        Self {
            prompt: question.prompt.clone(),
            choices,
        }
    }
}

/// Current scores for both slots as sent to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct ScoreBoard {
    /// Score of the participant in slot A.
    pub slot_a: u32,
    /// Score of the participant in slot B.
    pub slot_b: u32,
}

impl From<Scores> for ScoreBoard {
    fn from(value: Scores) -> Self {
        Self {
            slot_a: value.slot_a,
            slot_b: value.slot_b,
        }
    }
}

/// Final result of a match: a winning participant or an explicit tie.
///
/// The tie marker is a distinct variant, never a participant id; clients
/// must not treat it as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchWinner {
    /// The participant with the strictly higher final score.
    Participant {
        /// Winner's stable id.
        id: Uuid,
    },
    /// Equal final scores.
    Tie,
}

/// Events pushed to participant WebSocket clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent to the re-joining owner while slot B is still empty.
    Waiting {
        /// Human-readable hint.
        message: String,
    },
    /// Sent to a joiner whose target room already holds two participants.
    RoomFull {
        /// Human-readable rejection.
        message: String,
    },
    /// Both participants are connected; sent to the joiner first, then the
    /// rest of the room.
    RoomReady {
        /// Human-readable confirmation.
        message: String,
        /// Updated room record.
        room: RoomSnapshot,
    },
    /// The match started; carries the first question.
    GameStarted {
        /// Redacted first question.
        question: QuestionView,
        /// 1-based position of the question.
        question_number: usize,
        /// Zeroed starting scores.
        scores: ScoreBoard,
    },
    /// Private acknowledgment of a submitted answer.
    Answered {
        /// Whether the submitted text matched exactly.
        is_correct: bool,
        /// The correct answer text.
        correct_answer: String,
    },
    /// Both slots answered; scores at the end of the round.
    ScoresUpdated {
        /// Updated scores.
        scores: ScoreBoard,
    },
    /// The next question, broadcast after the pacing delay.
    NextQuestion {
        /// Redacted upcoming question.
        question: QuestionView,
        /// 1-based position of the question.
        question_number: usize,
        /// Length of the fixed sequence.
        total_questions: usize,
    },
    /// The match is over.
    GameOver {
        /// Final scores.
        scores: ScoreBoard,
        /// Winner or tie marker.
        winner: MatchWinner,
    },
    /// Recoverable failure, reported to the offending participant only.
    Error {
        /// Human-readable description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let parsed: ClientMessage = serde_json::from_str(
            r#"{"type": "submit_answer", "code": "123456",
                "participant_id": "7f0c0f0a-58c4-4f0f-8f3a-111111111111",
                "answer": "Paris"}"#,
        )
        .unwrap();
        assert!(matches!(parsed, ClientMessage::SubmitAnswer { .. }));

        let parsed: ClientMessage =
            serde_json::from_str(r#"{"type": "something_else"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::Unknown));
    }

    #[test]
    fn redacted_question_never_exposes_answer_fields() {
        let question = Question {
            prompt: "Capital of France?".into(),
            correct_answer: "Paris".into(),
            distractors: vec!["Lyon".into(), "Nice".into(), "Lille".into()],
        };

        let view = QuestionView::redact(&question);
        let json = serde_json::to_string(&view).unwrap();

        assert!(!json.contains("correct_answer"));
        assert!(!json.contains("distractors"));
        assert_eq!(view.choices.len(), 4);
        assert!(view.choices.contains(&"Paris".to_string()));
    }

    #[test]
    fn tie_marker_is_distinct_from_participant_ids() {
        let tie = serde_json::to_string(&MatchWinner::Tie).unwrap();
        assert_eq!(tie, r#"{"result":"tie"}"#);

        let id = Uuid::new_v4();
        let winner = serde_json::to_string(&MatchWinner::Participant { id }).unwrap();
        assert!(winner.contains(&id.to_string()));
        assert!(winner.contains(r#""result":"participant""#));
    }
}
