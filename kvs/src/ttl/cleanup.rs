use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::Error;
use crate::ttl::{KvsExtended, TtlStore};

/// Handle for the periodic expired-entry sweep of a TTL store.
///
/// Each interval the loop reads the current state, computes the expired set
/// and, only when it is non-empty, issues a single batched removal. Sweep
/// failures are logged and swallowed; the loop keeps running until the
/// handle is stopped or dropped. Cancellation lands at the interval sleep,
/// so a stopped job never tears down mid-write.
pub struct CleanupJob {
    store: TtlStore,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl CleanupJob {
    pub(crate) fn new(store: TtlStore, interval: Duration) -> Self {
        CleanupJob { store, interval, handle: None }
    }

    /// Launches the sweep loop. Starting an already-running job is a no-op.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let store = self.store.clone();
        let interval = self.interval;
        self.handle = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match store.remove_expired().await {
                    Ok(0) => {}
                    Ok(count) => log::debug!("cleanup removed {} expired entries", count),
                    Err(Error::Cancelled) => break,
                    Err(err) => log::error!("cleanup sweep failed: {}", err),
                }
            }
        }));
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|handle| !handle.is_finished()).unwrap_or(false)
    }

    /// Tears the loop down at its next cancellation point.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for CleanupJob {
    fn drop(&mut self) {
        self.stop();
    }
}
