use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Duel Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::auth::signup,
        crate::routes::auth::signin,
        crate::routes::room::create_room,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::auth::SignupRequest,
            crate::dto::auth::SigninRequest,
            crate::dto::auth::AuthResponse,
            crate::dto::room::CreateRoomResponse,
            crate::dto::room::RoomSnapshot,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::QuestionView,
            crate::dto::ws::ScoreBoard,
            crate::dto::ws::MatchWinner,
            crate::dao::models::RoomStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Participant registration and sign-in"),
        (name = "room", description = "Room creation"),
        (name = "match", description = "WebSocket operations for live matches"),
    )
)]
pub struct ApiDoc;
