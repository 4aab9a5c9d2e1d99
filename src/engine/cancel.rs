//! Cancellation token for long-running chain invocations
//!
//! The chain checks the token between stages only; a stage that has started
//! always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cloneable cancel flag with an optional deadline
///
/// Clones share the same flag, so a caller can keep one clone and hand the
/// other to the chain.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Create a token that only trips when [`cancel`](Self::cancel) is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that also trips once `timeout` has elapsed from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested or the deadline has passed
    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn test_cancel_shared_between_clones() {
        let token = CancellationToken::new();
        let handed_out = token.clone();
        token.cancel();
        assert!(handed_out.is_cancelled());
    }

    #[test]
    fn test_expired_deadline() {
        let token = CancellationToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());

        let generous = CancellationToken::with_timeout(Duration::from_secs(3600));
        assert!(!generous.is_cancelled());
    }
}
