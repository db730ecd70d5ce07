pub mod hub;
pub mod session;
pub mod sessions;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    config::AppConfig, dao::match_store::MatchStore, error::ServiceError,
    questions::QuestionSupply, services::auth_service::TokenSigner,
};

pub use self::hub::RoomHub;
pub use self::sessions::SessionStore;

/// Cheaply clonable handle to the shared application state.
pub type SharedState = Arc<AppState>;

/// Central application state shared across routes, sockets, and background
/// tasks.
pub struct AppState {
    store: RwLock<Option<Arc<dyn MatchStore>>>,
    supply: Arc<dyn QuestionSupply>,
    sessions: SessionStore,
    hub: RoomHub,
    config: AppConfig,
    tokens: TokenSigner,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a store is installed.
    pub fn new(
        config: AppConfig,
        supply: Arc<dyn QuestionSupply>,
        tokens: TokenSigner,
    ) -> SharedState {
        Arc::new(Self {
            store: RwLock::new(None),
            supply,
            sessions: SessionStore::new(),
            hub: RoomHub::new(),
            config,
            tokens,
        })
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the match store or fail with the degraded-mode error.
    pub async fn require_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn MatchStore>) {
        let mut guard = self.store.write().await;
        *guard = Some(store);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        let mut guard = self.store.write().await;
        guard.take();
    }

    /// Whether the application is running without a store.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Question source consulted once per match start.
    pub fn supply(&self) -> Arc<dyn QuestionSupply> {
        self.supply.clone()
    }

    /// Live sessions keyed by room code.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Notification registry for connected participants.
    pub fn hub(&self) -> &RoomHub {
        &self.hub
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Signer used to mint and verify participant bearer tokens.
    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }
}
