//! State shared between the stream loop and outside readers.
//!
//! The smoothed profile and the cached track info sit behind a single
//! `RwLock`. Callers never get a reference into the guarded data: updates go
//! through `apply_profile` / `update_track`, reads copy out or run a closure
//! while the read lock is held.

use super::smoothing::ProfileSmoother;
use crate::source::TrackInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::watch;

struct Guarded {
    smoother: ProfileSmoother,
    track: TrackInfo,
}

/// Smoothed profile and track info under one reader/writer lock.
pub struct SharedState {
    inner: RwLock<Guarded>,
}

impl SharedState {
    pub fn new(width: usize, smooth_factor: f64) -> Self {
        Self {
            inner: RwLock::new(Guarded {
                smoother: ProfileSmoother::new(width, smooth_factor),
                track: TrackInfo::default(),
            }),
        }
    }

    /// Folds a freshly reduced profile into the smoothed one.
    pub fn apply_profile(&self, raw: &[f64]) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.smoother.update(raw);
    }

    /// Returns a copy of the smoothed profile.
    pub fn profile(&self) -> Vec<f64> {
        self.with_profile(|values| values.to_vec())
    }

    /// Runs `f` against the smoothed profile while holding the read lock.
    pub fn with_profile<R>(&self, f: impl FnOnce(&[f64]) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(guard.smoother.values())
    }

    pub fn track(&self) -> TrackInfo {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.track.clone()
    }

    /// Mutates the cached track info in place and returns a copy of the result.
    pub fn update_track(&self, f: impl FnOnce(&mut TrackInfo)) -> TrackInfo {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard.track);
        guard.track.clone()
    }
}

/// One-shot cancellation signal shared between a run and its controllers.
///
/// Once cancelled it stays cancelled; waiters that subscribe late still see it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a stream is running, and the token that stops it.
#[derive(Default)]
pub struct RunState {
    running: AtomicBool,
    cancel: Mutex<Option<CancelToken>>,
}

impl RunState {
    /// Marks a new run as started and returns its guard.
    ///
    /// Any previous run's token is cancelled and replaced.
    pub fn begin(&self) -> RunGuard<'_> {
        let token = CancelToken::new();
        let previous = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        self.running.store(true, Ordering::SeqCst);
        RunGuard { state: self, token }
    }

    /// Cancels the current run, if any, and reports not-running.
    pub fn stop(&self) {
        if let Some(token) = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            token.cancel();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Clears the running flag when the run scope ends, whatever the exit path.
pub struct RunGuard<'a> {
    state: &'a RunState,
    token: CancelToken,
}

impl RunGuard<'_> {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        // A newer run may already own the flag.
        let current = self
            .state
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let is_current = current
            .as_ref()
            .is_some_and(|token| Arc::ptr_eq(&token.tx, &self.token.tx));
        if is_current {
            self.state.running.store(false, Ordering::SeqCst);
        }
    }
}
