use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Payload used to register a new participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignupRequest {
    /// Display name shown to opponents.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Sign-in email, unique across participants.
    #[validate(email)]
    pub email: String,
    /// Plain password, hashed before storage.
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Payload used to sign an existing participant in.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SigninRequest {
    /// Registered email.
    #[validate(email)]
    pub email: String,
    /// Plain password to verify.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token response returned by signup and signin.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Bearer token for authenticated routes.
    pub token: String,
    /// Stable identifier to present in room events.
    pub participant_id: Uuid,
}
