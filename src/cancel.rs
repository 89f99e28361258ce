use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::FileSortError;

/// Cooperative cancellation signal shared by the producer, the sorting workers and the merger.
///
/// Clones observe the same flag. A token created with [CancellationToken::child] is cancelled
/// when either itself or its parent is cancelled, which lets a failing worker stop its siblings
/// without cancelling the caller's token.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancellationToken>>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.parent.as_ref().map_or(false, |parent| parent.is_cancelled())
    }

    /// Fail with [FileSortError::Cancelled] if cancellation was requested
    pub fn check(&self) -> Result<(), anyhow::Error> {
        if self.is_cancelled() {
            Err(FileSortError::Cancelled.into())
        } else {
            Ok(())
        }
    }

    pub(crate) fn child(&self) -> CancellationToken {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
        }
    }
}
