//! FIFO hand-off mutex serializing resubmission batches.
//!
//! A resubmission enqueues several jobs after checking admission; holding this
//! lock across the whole sequence keeps two resubmissions from interleaving.
//! Ordinary submissions never touch it.
//!
//! Release does not free the lock while anyone is waiting. Holdership passes
//! straight to the oldest waiter, optionally after a short hand-off delay that
//! spaces consecutive batches apart. The delay is a tunable, not part of the
//! exclusion guarantee.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Hand-off delay used when none is configured.
pub const DEFAULT_HANDOFF_DELAY: Duration = Duration::from_millis(100);

struct LockState {
    held: bool,
    waiters: VecDeque<oneshot::Sender<ResubmitGuard>>,
}

struct Inner {
    state: Mutex<LockState>,
    handoff_delay: Duration,
}

/// Single-holder async lock with a FIFO wait list.
#[derive(Clone)]
pub struct ResubmitMutex {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ResubmitMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResubmitMutex")
            .field("held", &self.is_held())
            .field("waiters", &self.waiters())
            .field("handoff_delay", &self.inner.handoff_delay)
            .finish()
    }
}

impl Default for ResubmitMutex {
    fn default() -> Self {
        Self::new(DEFAULT_HANDOFF_DELAY)
    }
}

impl ResubmitMutex {
    /// Create a free lock. A zero delay hands off synchronously on release.
    #[must_use]
    pub fn new(handoff_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(LockState {
                    held: false,
                    waiters: VecDeque::new(),
                }),
                handoff_delay,
            }),
        }
    }

    /// Take the lock, waiting behind earlier acquirers if it is held.
    pub async fn acquire(&self) -> ResubmitGuard {
        loop {
            let rx = {
                let mut state = self.inner.state.lock();
                if !state.held {
                    state.held = true;
                    return ResubmitGuard {
                        inner: Arc::clone(&self.inner),
                    };
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                tracing::debug!(waiters = state.waiters.len(), "resubmit lock busy, waiting");
                rx
            };
            if let Ok(guard) = rx.await {
                return guard;
            }
        }
    }

    /// Take the lock only if it is free right now.
    #[must_use]
    pub fn try_acquire(&self) -> Option<ResubmitGuard> {
        let mut state = self.inner.state.lock();
        if state.held {
            return None;
        }
        state.held = true;
        Some(ResubmitGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Whether some caller holds the lock (or is being handed it).
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.inner.state.lock().held
    }

    /// Number of queued acquirers.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }
}

/// Proof of holding the resubmit lock. Releases on drop.
pub struct ResubmitGuard {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ResubmitGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResubmitGuard").finish_non_exhaustive()
    }
}

impl ResubmitGuard {
    /// Release explicitly. Same as dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ResubmitGuard {
    fn drop(&mut self) {
        release(&self.inner);
    }
}

fn release(inner: &Arc<Inner>) {
    {
        let mut state = inner.state.lock();
        if state.waiters.is_empty() {
            state.held = false;
            tracing::trace!("resubmit lock freed");
            return;
        }
    }

    if inner.handoff_delay.is_zero() {
        hand_off(inner);
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let inner = Arc::clone(inner);
            handle.spawn(async move {
                tokio::time::sleep(inner.handoff_delay).await;
                hand_off(&inner);
            });
        }
        Err(_) => hand_off(inner),
    }
}

/// Pass holdership to the oldest live waiter, or free the lock.
fn hand_off(inner: &Arc<Inner>) {
    let next = {
        let mut state = inner.state.lock();
        match state.waiters.pop_front() {
            Some(tx) => tx,
            None => {
                state.held = false;
                return;
            }
        }
    };
    tracing::debug!("resubmit lock handed to next waiter");
    let guard = ResubmitGuard {
        inner: Arc::clone(inner),
    };
    // A waiter that gave up returns the guard; dropping it moves on to the
    // next waiter.
    if let Err(unclaimed) = next.send(guard) {
        drop(unclaimed);
    }
}
