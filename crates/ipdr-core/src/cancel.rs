//! Caller-supplied abort signal.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cloneable flag checked by the processor between chunks and batches.
///
/// Clones share the same flag, so a UI thread can hold one clone and cancel
/// work running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::CancellationToken;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let remote = token.clone();
        assert!(!token.is_cancelled());

        remote.cancel();
        assert!(token.is_cancelled(), "cancel on a clone must be visible");
    }
}
