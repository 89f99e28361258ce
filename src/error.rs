use thiserror::Error;

/// Typed failures raised by the sort engine.
///
/// Engine functions return [anyhow::Error]; callers that need to tell an abort apart from a
/// failure use `error.downcast_ref::<FileSortError>()`.
#[derive(Debug, Error)]
pub enum FileSortError {
    /// A line is not of the form `<integer>.<text>`
    #[error("line: {line:?}, error: {reason}")]
    Parse {
        line: String,
        reason: String,
    },

    /// The sort was cancelled before it could complete
    #[error("the operation was aborted")]
    Cancelled,

    /// The sort cannot start, e.g. the work folder is not empty
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A segment decoded to a different number of lines than was counted while reading it
    #[error("segment line count mismatch, expected: {expected}, actual: {actual}")]
    Invariant {
        expected: usize,
        actual: usize,
    },
}

impl FileSortError {
    pub(crate) fn parse(line: &str, reason: &str) -> FileSortError {
        FileSortError::Parse {
            line: line.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Returns true when the error chain carries [FileSortError::Cancelled]
pub fn is_cancelled(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| matches!(cause.downcast_ref::<FileSortError>(), Some(FileSortError::Cancelled)))
}
