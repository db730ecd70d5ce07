use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::match_store::StorageError, questions::SupplyError, state::session::AnswerError,
};

/// Errors that can occur in service layer operations.
///
/// The first seven variants are the recoverable, participant-visible
/// conditions of the match protocol; their display strings are the exact
/// wire messages. The rest are ambient failures surfaced over REST or
/// logged at the socket boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No room matches the given code.
    #[error("Room not found")]
    RoomNotFound,
    /// Both slots of the room are taken.
    #[error("Room already has 2 players")]
    RoomFull,
    /// The room has already left the waiting state.
    #[error("Game already started")]
    AlreadyStarted,
    /// The room exists but its match has not started.
    #[error("Game not started")]
    GameNotStarted,
    /// The room is started but no live session exists.
    #[error("Game not found")]
    GameNotFound,
    /// No question exists at the current index.
    #[error("Question not found")]
    QuestionNotFound,
    /// The participant already answered the current question.
    #[error("Already answered")]
    AlreadyAnswered,
    /// Storage backend failed mid-operation.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running without a storage backend.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// The question provider failed or returned nothing.
    #[error("question provider failed")]
    Supply(#[source] SupplyError),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl ServiceError {
    /// Whether this error is a recoverable match-protocol condition safe to
    /// echo verbatim to the offending participant.
    pub fn is_participant_visible(&self) -> bool {
        matches!(
            self,
            ServiceError::RoomNotFound
                | ServiceError::RoomFull
                | ServiceError::AlreadyStarted
                | ServiceError::GameNotStarted
                | ServiceError::GameNotFound
                | ServiceError::QuestionNotFound
                | ServiceError::AlreadyAnswered
        )
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<AnswerError> for ServiceError {
    fn from(err: AnswerError) -> Self {
        match err {
            AnswerError::AlreadyAnswered => ServiceError::AlreadyAnswered,
            AnswerError::QuestionExhausted => ServiceError::QuestionNotFound,
        }
    }
}

impl From<SupplyError> for ServiceError {
    fn from(err: SupplyError) -> Self {
        ServiceError::Supply(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::RoomNotFound | ServiceError::GameNotFound => {
                AppError::NotFound(err.to_string())
            }
            ServiceError::RoomFull
            | ServiceError::AlreadyStarted
            | ServiceError::GameNotStarted
            | ServiceError::QuestionNotFound
            | ServiceError::AlreadyAnswered => AppError::Conflict(err.to_string()),
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Supply(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
