use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::RoomEntity, dto::room::CreateRoomResponse, error::ServiceError,
    state::SharedState,
};

/// Create a room owned by `owner` and return its code.
///
/// Codes live in a six-digit numeric space, so accidental collisions are
/// possible; the registry insert is the arbiter and a taken code is retried
/// with a fresh draw up to the configured attempt budget.
pub async fn create_room(
    state: &SharedState,
    owner: Uuid,
) -> Result<CreateRoomResponse, ServiceError> {
    let store = state.require_store().await?;

    for _ in 0..state.config().code_attempts() {
        let code = generate_code();
        if store.insert_room(RoomEntity::new(code.clone(), owner)).await? {
            info!(%code, %owner, "room created");
            return Ok(CreateRoomResponse { code });
        }
        warn!(%code, "room code collision; retrying");
    }

    Err(ServiceError::Conflict(
        "could not allocate an unused room code".into(),
    ))
}

/// Six decimal digits, never starting with zero.
fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            match_store::{MatchStore, memory::MemoryMatchStore},
            models::RoomStatus,
        },
        dto::validation::validate_room_code,
        questions::FixedQuestionSupply,
        services::auth_service::TokenSigner,
        state::{AppState, SharedState},
    };

    async fn test_state() -> (SharedState, MemoryMatchStore) {
        let store = MemoryMatchStore::new();
        let state = AppState::new(
            AppConfig::for_tests(Duration::from_millis(10)),
            Arc::new(FixedQuestionSupply::new(Vec::new())),
            TokenSigner::new(b"test-secret".to_vec(), Duration::from_secs(60)),
        );
        state.install_store(Arc::new(store.clone())).await;
        (state, store)
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            assert!(validate_room_code(&generate_code()).is_ok());
        }
    }

    #[tokio::test]
    async fn created_rooms_start_waiting_with_the_owner_in_slot_a() {
        let (state, store) = test_state().await;
        let owner = Uuid::new_v4();

        let response = create_room(&state, owner).await.unwrap();

        let room = store.find_room(&response.code).await.unwrap().unwrap();
        assert_eq!(room.slot_a, owner);
        assert_eq!(room.slot_b, None);
        assert_eq!(room.status, RoomStatus::Waiting);
    }
}
