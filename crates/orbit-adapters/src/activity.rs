//! Debounced activity tracking for the unlocked side panel.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use orbit_core::{ClockPort, KeyValuePort, LockStore};
use tokio::task::JoinHandle;

use crate::config::OrbitConfig;

/// Trailing-edge debounce: every call cancels the pending timer and starts a
/// new one, so a burst runs `f` once after `delay` of quiet.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Must be called inside a Tokio runtime.
    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        let mut pending = match self.pending.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(task) = pending.take() {
                task.abort();
            }
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Records user interaction (click, keypress, scroll, focus) against the
/// session lock, at most once per debounce window.
#[derive(Debug)]
pub struct ActivityTracker<S, C> {
    lock: Arc<LockStore<S>>,
    clock: Arc<C>,
    debouncer: Debouncer,
}

impl<S, C> ActivityTracker<S, C>
where
    S: KeyValuePort + Send + Sync + 'static,
    C: ClockPort + Send + Sync + 'static,
{
    pub fn new(lock: LockStore<S>, clock: C, debounce: Duration) -> Self {
        Self {
            lock: Arc::new(lock),
            clock: Arc::new(clock),
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn from_config(lock: LockStore<S>, clock: C, config: &OrbitConfig) -> Self {
        Self::new(lock, clock, config.activity_debounce())
    }

    pub fn record_interaction(&self) {
        let lock = Arc::clone(&self.lock);
        let clock = Arc::clone(&self.clock);
        self.debouncer.call(move || {
            let now = match clock.now() {
                Ok(now) => now,
                Err(e) => {
                    tracing::warn!(error = %e, "clock unavailable, activity not recorded");
                    return;
                }
            };
            if let Err(e) = lock.record_activity(now) {
                tracing::warn!(error = %e, "failed to record activity");
            }
        });
    }
}
