use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::match_store::{MatchStore, StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Keep the shared state supplied with a healthy store.
///
/// Connects with exponential backoff, installs the store, then polls its
/// health; a failed check drops the store back into degraded mode and the
/// connect loop starts over. Room and participant operations simply fail
/// soft while no store is installed.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => sleep(HEALTH_POLL_INTERVAL).await,
                        Err(err) => {
                            warn!(error = %err, "storage health check failed");
                            match store.try_reconnect().await {
                                Ok(()) => {
                                    info!("storage reconnection succeeded");
                                }
                                Err(reconnect_err) => {
                                    warn!(
                                        error = %reconnect_err,
                                        "storage reconnect failed; entering degraded mode"
                                    );
                                    state.clear_store().await;
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}
