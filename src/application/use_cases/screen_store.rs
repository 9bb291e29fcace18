use std::sync::{Mutex, MutexGuard};

use crate::domain::screen::ScreenState;

/// What became of a submit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// One request was issued and answered
    Completed,
    /// A request from this screen is still in flight; nothing was sent
    Ignored,
    /// Refused before any request (missing file, invalid parameters)
    Rejected(String),
    /// The request failed; carries the message shown to the user
    Failed(String),
}

/// Owner of one screen's state.
///
/// The lock is only held while reducing, never across an `.await`.
pub struct ScreenStore<S: ScreenState> {
    state: Mutex<S>,
}

impl<S: ScreenState> ScreenStore<S> {
    pub fn new() -> Self {
        Self::with_state(S::default())
    }

    pub fn with_state(state: S) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> S {
        self.lock().clone()
    }

    /// Apply `action` and return the resulting state
    pub fn dispatch(&self, action: S::Action) -> S {
        let mut guard = self.lock();
        let current = std::mem::take(&mut *guard);
        *guard = current.reduce(action);
        guard.clone()
    }

    /// Apply `started` unless a request is already in flight.
    ///
    /// Check and transition happen under one lock, so two concurrent
    /// submits cannot both pass.
    pub fn begin(&self, started: S::Action) -> bool {
        let mut guard = self.lock();
        if guard.is_loading() {
            return false;
        }
        let current = std::mem::take(&mut *guard);
        *guard = current.reduce(started);
        true
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: ScreenState> Default for ScreenStore<S> {
    fn default() -> Self {
        Self::new()
    }
}
