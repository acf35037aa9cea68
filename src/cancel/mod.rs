//! Cooperative cancellation, wired to SIGINT/SIGTERM via `ctrlc`.
//!
//! Mirrors the teacher's `signal::SignalState` atomic-bool pattern, but
//! stripped to the single flag a comparison run needs: every
//! long-running phase polls [`CancellationToken::is_cancelled`] between
//! units of work and returns promptly once it flips.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply `Clone`-able, `Arc`-shared cancellation flag.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Register this token with `ctrlc` so SIGINT/SIGTERM flips it.
    /// Installs a process-wide handler; call at most once per process.
    pub fn install_signal_handler(&self) -> Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || token.cancel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
