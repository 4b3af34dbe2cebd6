//! Per-run cancellation tokens for the evolution loop.
//!
//! Every `start()` mints a fresh [`RunToken`]. Each in-flight round carries
//! a clone of the token that dispatched it, and the driver applies a
//! response only if that exact token is still the current one and has not
//! been cancelled, so a response from a superseded run is never applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

/// Identifier of one evolution run, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cooperative cancellation token shared between the driver and the
/// rounds it dispatched.
#[derive(Debug, Clone)]
pub struct RunToken {
    id: RunId,
    cancelled: Arc<AtomicBool>,
}

impl RunToken {
    /// Mint a token for a new run.
    pub fn new() -> Self {
        Self {
            id: RunId::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The run this token belongs to.
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether `other` was minted by the same `start()` as `self`.
    pub fn same_run(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for RunToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_token_is_live() {
        let token = RunToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = RunToken::new();
        let round = token.clone();
        token.cancel();
        assert!(round.is_cancelled());
        token.cancel();
        assert!(round.is_cancelled());
    }

    #[test]
    fn tokens_from_different_runs_differ() {
        let first = RunToken::new();
        let second = RunToken::new();
        assert!(first.same_run(&first.clone()));
        assert!(!first.same_run(&second));
        assert_ne!(first.id(), second.id());
        first.cancel();
        assert!(!second.is_cancelled());
    }
}
