//! Single-flight token refresh
//!
//! Several requests can fail with 401 at once when an access token expires.
//! Only one of them may call the refresh endpoint; the others wait for it and
//! reuse its outcome. Requests record the generation they were sent under:
//! if a refresh completed after that point, their 401 was caused by the old
//! token and the completed refresh already answers it.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    /// Number of completed refresh attempts
    generation: AtomicU64,
    /// Outcome of the latest attempt; the lock is held while one runs
    last: Mutex<Option<Result<()>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation. Read it before sending a request and hand it back
    /// to `refresh` if that request comes back 401.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run `refresh` unless an attempt finished after `observed`, in which
    /// case that attempt's outcome is returned instead.
    pub async fn refresh<F, Fut>(&self, observed: u64, refresh: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut last = self.last.lock().await;

        if self.generation.load(Ordering::Acquire) != observed
            && let Some(outcome) = last.as_ref()
        {
            debug!(observed, "reusing completed token refresh");
            return outcome.clone();
        }

        let outcome = refresh().await;
        *last = Some(outcome.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        outcome
    }
}
