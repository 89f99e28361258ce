use std::sync::atomic::{AtomicU64, Ordering};

/// Issues the numbers used to name sorted segment files.
///
/// Every call to [SequenceNumber::next] returns a distinct value, starting at 0, no matter how
/// many workers share the generator.
#[derive(Debug, Default)]
pub(crate) struct SequenceNumber {
    current: AtomicU64,
}

impl SequenceNumber {
    pub(crate) fn new() -> SequenceNumber {
        SequenceNumber::default()
    }

    pub(crate) fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst)
    }
}
