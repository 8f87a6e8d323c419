//! # Timeout Checker
//!
//! A periodic sweep over the pending table, started on the first pending
//! insertion and stopped once the table drains. Spawned with `tokio::spawn`
//! as a loop owned by its own task, not driven by the caller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::PeerError;
use crate::pending::PendingTable;

/// Interval between sweeps.
pub(crate) const CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the lifecycle of the sweep task. A peer holds exactly one of these.
pub(crate) struct TimeoutChecker {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TimeoutChecker {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Starts the sweep loop if it is not already running. Safe to call
    /// unconditionally on every insertion; a second call while the loop is
    /// alive is a no-op.
    pub fn ensure_running(&self, pending: Arc<PendingTable>, timeout: Duration) {
        let mut guard = self.handle.lock().unwrap();
        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CHECK_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let (expired, is_empty) = pending.sweep_expired(timeout);
                for (id, waiter) in expired {
                    tracing::trace!(id, method = waiter.method, "request timed out");
                    let _ = waiter
                        .tx
                        .send(Err(PeerError::request_timeout().with_correlation_id(id)));
                }
                if is_empty {
                    tracing::trace!("pending table empty, stopping timeout checker");
                    break;
                }
            }
        });
        *guard = Some(handle);
    }

    /// Aborts the sweep loop unconditionally (teardown).
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for TimeoutChecker {
    fn drop(&mut self) {
        self.stop();
    }
}
