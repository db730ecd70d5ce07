pub mod http;

use futures::future::BoxFuture;
use thiserror::Error;

/// A single quiz item. Immutable once fetched; the correct answer is matched
/// exactly, with no normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Text shown to both participants.
    pub prompt: String,
    /// The one accepted answer.
    pub correct_answer: String,
    /// Wrong choices shown alongside the correct answer.
    pub distractors: Vec<String>,
}

/// Errors raised while fetching a question sequence.
#[derive(Debug, Error)]
pub enum SupplyError {
    /// The provider could not be reached or returned a bad status.
    #[error("question provider unreachable")]
    Transport(#[from] reqwest::Error),
    /// The provider answered with no usable questions.
    #[error("question provider returned an empty set")]
    Empty,
}

/// Source of the fixed question sequence handed to a match at start.
///
/// Called exactly once per match, outside any per-answer critical path.
pub trait QuestionSupply: Send + Sync {
    /// Fetch an ordered, fixed-length question list for one session.
    fn fetch_questions(&self) -> BoxFuture<'static, Result<Vec<Question>, SupplyError>>;
}

/// Deterministic supply backed by a pre-built list; used by tests and demos.
pub struct FixedQuestionSupply {
    questions: Vec<Question>,
}

impl FixedQuestionSupply {
    /// Wrap a prepared question list.
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

impl QuestionSupply for FixedQuestionSupply {
    fn fetch_questions(&self) -> BoxFuture<'static, Result<Vec<Question>, SupplyError>> {
        let questions = self.questions.clone();
        Box::pin(async move {
            if questions.is_empty() {
                return Err(SupplyError::Empty);
            }
            Ok(questions)
        })
    }
}
