//! Process-wide cancellation token
//!
//! Created once at startup and handed explicitly to the rig and to every
//! voice. `cancel()` is safe to call from a signal-handler thread: it flips
//! the flag, wakes anything sleeping in [`ShutdownToken::wait_timeout`], and
//! sends the quit signal to every registered voice, including voices parked
//! in the paused state.

use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use crate::engine::RunSignal;

struct Inner {
    cancelled: Mutex<bool>,
    cv: Condvar,
    listeners: Mutex<Vec<Weak<RunSignal>>>,
}

#[derive(Clone)]
pub struct ShutdownToken {
    inner: Arc<Inner>,
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: Mutex::new(false),
                cv: Condvar::new(),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Request shutdown; idempotent
    pub fn cancel(&self) {
        {
            let mut cancelled = self
                .inner
                .cancelled
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *cancelled {
                return;
            }
            *cancelled = true;
        }
        self.inner.cv.notify_all();

        log::debug!("shutdown requested");

        let listeners = std::mem::take(
            &mut *self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for signal in listeners.iter().filter_map(Weak::upgrade) {
            signal.quit();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep up to `timeout`; returns true as soon as shutdown is requested
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = self
                .inner
                .cv
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Quit `signal` on cancellation (immediately if already cancelled)
    pub(crate) fn register(&self, signal: &Arc<RunSignal>) {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.is_cancelled() {
            drop(listeners);
            signal.quit();
            return;
        }

        listeners.retain(|weak| weak.strong_count() > 0);
        listeners.push(Arc::downgrade(signal));
    }
}
