use thiserror::Error;

use crate::dao::models::Slot;
use crate::questions::Question;

/// Ephemeral per-match state, keyed by room code in the session store.
///
/// A session exists exactly while its room is `Started`. It is owned by the
/// coordinator and only ever mutated behind the per-room lock, so every
/// method here can assume exclusive access.
#[derive(Debug)]
pub struct MatchSession {
    questions: Vec<Question>,
    current_index: usize,
    score_a: u32,
    score_b: u32,
    answered_a: bool,
    answered_b: bool,
}

/// Running scores for both slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scores {
    /// Score of the participant in slot A.
    pub slot_a: u32,
    /// Score of the participant in slot B.
    pub slot_b: u32,
}

/// Errors raised while recording an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnswerError {
    /// The slot already answered the current question; the answer is not
    /// counted a second time.
    #[error("participant already answered the current question")]
    AlreadyAnswered,
    /// No question exists at the current index. Defensive: reachable only
    /// when an answer races the final round teardown.
    #[error("no question at the current index")]
    QuestionExhausted,
}

/// What one recorded answer obliges the coordinator to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Whether the submitted text matched the correct answer exactly.
    pub correct: bool,
    /// The correct answer, echoed back privately to the submitter.
    pub correct_answer: String,
    /// Set when this answer closed the round.
    pub round: Option<RoundAdvance>,
}

/// Outcome of a completed round. Produced only once both slots answered;
/// the answered flags are already reset and the index already advanced by
/// the time the caller sees this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundAdvance {
    /// More questions remain; the next one sits at `next_index`.
    NextQuestion {
        /// Scores at the end of the closed round.
        scores: Scores,
        /// Index of the upcoming question.
        next_index: usize,
    },
    /// The closed round was the last one.
    Completed {
        /// Final scores for the match.
        scores: Scores,
    },
}

impl MatchSession {
    /// Start a session at the first question with zeroed scores and flags.
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            current_index: 0,
            score_a: 0,
            score_b: 0,
            answered_a: false,
            answered_b: false,
        }
    }

    /// Index of the question currently being answered.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Length of the fixed question sequence.
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Current scores snapshot.
    pub fn scores(&self) -> Scores {
        Scores {
            slot_a: self.score_a,
            slot_b: self.score_b,
        }
    }

    /// The question at the current index, absent once the match is over.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    /// Grade `answer` against the current question without touching any
    /// state. Used for participants occupying neither slot, who receive an
    /// acknowledgment but cannot affect the game.
    pub fn check_answer(&self, answer: &str) -> Result<(bool, String), AnswerError> {
        let question = self.current_question().ok_or(AnswerError::QuestionExhausted)?;
        Ok((
            answer == question.correct_answer,
            question.correct_answer.clone(),
        ))
    }

    /// Record `slot`'s single answer for the current question.
    ///
    /// The answered flag guards double counting; the score moves by exactly
    /// one on an exact match. When this call sets the second flag, the round
    /// closes in the same step: flags reset and index advance together, so a
    /// late answer for the previous question can never leak into the next
    /// round.
    pub fn record_answer(&mut self, slot: Slot, answer: &str) -> Result<AnswerRecord, AnswerError> {
        let question = self
            .questions
            .get(self.current_index)
            .ok_or(AnswerError::QuestionExhausted)?;
        let correct = answer == question.correct_answer;
        let correct_answer = question.correct_answer.clone();

        match slot {
            Slot::A => {
                if self.answered_a {
                    return Err(AnswerError::AlreadyAnswered);
                }
                self.answered_a = true;
                if correct {
                    self.score_a += 1;
                }
            }
            Slot::B => {
                if self.answered_b {
                    return Err(AnswerError::AlreadyAnswered);
                }
                self.answered_b = true;
                if correct {
                    self.score_b += 1;
                }
            }
        }

        let round = (self.answered_a && self.answered_b).then(|| {
            let scores = self.scores();
            self.answered_a = false;
            self.answered_b = false;
            self.current_index += 1;
            if self.current_index < self.questions.len() {
                RoundAdvance::NextQuestion {
                    scores,
                    next_index: self.current_index,
                }
            } else {
                RoundAdvance::Completed { scores }
            }
        });

        Ok(AnswerRecord {
            correct,
            correct_answer,
            round,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(prompt: &str, correct: &str) -> Question {
        Question {
            prompt: prompt.into(),
            correct_answer: correct.into(),
            distractors: vec!["x".into(), "y".into(), "z".into()],
        }
    }

    fn two_question_session() -> MatchSession {
        MatchSession::new(vec![
            question("Capital of France?", "Paris"),
            question("Capital of Italy?", "Rome"),
        ])
    }

    #[test]
    fn second_answer_from_same_slot_is_rejected() {
        let mut session = two_question_session();

        let first = session.record_answer(Slot::A, "Paris").unwrap();
        assert!(first.correct);
        assert_eq!(session.scores().slot_a, 1);

        let second = session.record_answer(Slot::A, "Paris");
        assert_eq!(second, Err(AnswerError::AlreadyAnswered));
        assert_eq!(session.scores().slot_a, 1);
    }

    #[test]
    fn answers_match_exactly_without_normalization() {
        let mut session = two_question_session();
        let record = session.record_answer(Slot::A, "paris").unwrap();
        assert!(!record.correct);
        assert_eq!(record.correct_answer, "Paris");
        assert_eq!(session.scores().slot_a, 0);
    }

    #[test]
    fn round_holds_until_both_slots_answer() {
        let mut session = two_question_session();

        let record = session.record_answer(Slot::A, "Paris").unwrap();
        assert_eq!(record.round, None);
        assert_eq!(session.current_index(), 0);

        let record = session.record_answer(Slot::B, "Lyon").unwrap();
        assert_eq!(
            record.round,
            Some(RoundAdvance::NextQuestion {
                scores: Scores { slot_a: 1, slot_b: 0 },
                next_index: 1,
            })
        );
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn round_close_resets_flags_for_the_next_question() {
        let mut session = two_question_session();
        session.record_answer(Slot::A, "Paris").unwrap();
        session.record_answer(Slot::B, "Paris").unwrap();

        // Both slots must be able to answer again immediately.
        assert!(session.record_answer(Slot::A, "Rome").is_ok());
        assert!(session.record_answer(Slot::B, "Rome").is_ok());
    }

    #[test]
    fn final_round_completes_the_match() {
        let mut session = two_question_session();
        session.record_answer(Slot::A, "Paris").unwrap();
        session.record_answer(Slot::B, "Milan").unwrap();
        session.record_answer(Slot::A, "Rome").unwrap();
        let record = session.record_answer(Slot::B, "Rome").unwrap();

        assert_eq!(
            record.round,
            Some(RoundAdvance::Completed {
                scores: Scores { slot_a: 2, slot_b: 1 },
            })
        );
        assert_eq!(session.current_question(), None);
    }

    #[test]
    fn answers_after_the_last_round_are_exhausted() {
        let mut session = MatchSession::new(vec![question("Q", "A")]);
        session.record_answer(Slot::A, "A").unwrap();
        session.record_answer(Slot::B, "A").unwrap();

        assert_eq!(
            session.record_answer(Slot::A, "A"),
            Err(AnswerError::QuestionExhausted)
        );
        assert_eq!(session.check_answer("A"), Err(AnswerError::QuestionExhausted));
    }

    #[test]
    fn check_answer_grades_without_mutating() {
        let session = two_question_session();
        let (correct, answer) = session.check_answer("Paris").unwrap();
        assert!(correct);
        assert_eq!(answer, "Paris");
        assert_eq!(session.scores(), Scores { slot_a: 0, slot_b: 0 });
    }
}
