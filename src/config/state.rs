// Application state module
// Process-lifetime state shared by every connection

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::types::Config;
use crate::coder::Coder;

/// Application state
pub struct AppState {
    pub config: Config,
    pub coder: Arc<dyn Coder>,

    // Present only when coder calls are serialized
    coder_lock: Option<Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(config: Config, coder: Arc<dyn Coder>) -> Self {
        let coder_lock = config
            .coder
            .serialize_requests
            .then(|| Arc::new(Mutex::new(())));

        Self {
            config,
            coder,
            coder_lock,
        }
    }

    /// Wait for exclusive use of the coder when serialization is enabled.
    ///
    /// The guard must be kept alive until the coder call (or the whole
    /// stream) has finished. Returns `None` when calls are not serialized.
    pub async fn acquire_coder(&self) -> Option<OwnedMutexGuard<()>> {
        match &self.coder_lock {
            Some(lock) => Some(Arc::clone(lock).lock_owned().await),
            None => None,
        }
    }

    #[inline]
    pub fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
