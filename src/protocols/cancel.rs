use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Aborts a pending wait on the target from another thread (e.g. a Ctrl-C
/// handler). A cancel request is consumed by the wait it aborts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns true and clears the flag if a cancel was pending
    pub(crate) fn take(&self) -> bool {
        self.cancelled.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());

        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn take_consumes_request() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.take());
        assert!(!token.take());
        assert!(!token.is_cancelled());
    }
}
