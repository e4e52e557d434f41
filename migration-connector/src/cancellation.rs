use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation signal, checked at phase boundaries and
/// between batches (spec §5). Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
        tracing::debug!("migration cancellation requested");
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(ConnectorError::Cancelled)` if the token has been
    /// cancelled. Intended to be called at phase boundaries and between
    /// data-migration batches.
    pub fn check(&self) -> crate::ConnectorResult<()> {
        if self.is_cancelled() {
            Err(crate::ConnectorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_token_observes_cancellation_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.check().is_err());
    }
}
