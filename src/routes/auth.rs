use axum::{Json, Router, extract::State, routing::post};
use axum_valid::Valid;

use crate::{
    dto::auth::{AuthResponse, SigninRequest, SignupRequest},
    error::AppError,
    services::auth_service,
    state::SharedState,
};

/// Routes handling participant registration and sign-in.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
}

/// Register a new participant and return their first bearer token.
#[utoipa::path(
    post,
    path = "/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Participant created", body = AuthResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SignupRequest>>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = auth_service::signup(&state, payload).await?;
    Ok(Json(response))
}

/// Verify credentials and return a fresh bearer token.
#[utoipa::path(
    post,
    path = "/signin",
    tag = "auth",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Incorrect credentials")
    )
)]
pub async fn signin(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SigninRequest>>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = auth_service::signin(&state, payload).await?;
    Ok(Json(response))
}
