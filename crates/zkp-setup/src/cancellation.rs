//! Cooperative cancellation for long-running setup and proving

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation token.
///
/// Clones share one flag; operations poll it between phases and stop with
/// [`Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

/// Returned when an operation observes a cancelled token
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled during {phase}")]
pub struct Cancelled {
    /// Phase that was about to start
    pub phase: &'static str,
}

impl Cancellation {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation for every clone of this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Fail with [`Cancelled`] if cancellation has been requested
    pub fn checkpoint(&self, phase: &'static str) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            tracing::debug!(phase, "cancellation observed");
            return Err(Cancelled { phase });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = Cancellation::new();
        let other = token.clone();
        assert!(token.checkpoint("start").is_ok());

        other.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.checkpoint("msm"), Err(Cancelled { phase: "msm" }));
    }
}
