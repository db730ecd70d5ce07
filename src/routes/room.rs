use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::room::CreateRoomResponse, error::AppError, services::auth_service::AuthParticipant,
    services::room_service, state::SharedState,
};

/// Routes handling room creation.
pub fn router() -> Router<SharedState> {
    Router::new().route("/rooms", post(create_room))
}

/// Create a room owned by the authenticated participant.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "room",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Room created", body = CreateRoomResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    AuthParticipant(owner): AuthParticipant,
) -> Result<Json<CreateRoomResponse>, AppError> {
    let response = room_service::create_room(&state, owner).await?;
    Ok(Json(response))
}
