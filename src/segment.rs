use anyhow::Context;

use crate::error::FileSortError;
use crate::line_record::LineRecord;

/// An unsorted, line aligned slice of the input.
///
/// `data` holds at most the configured number of bytes and may stop in the middle of a line,
/// `tail` holds the remainder of that line including its terminator, if any. Together they hold
/// exactly `line_count` complete lines.
#[derive(Debug)]
pub(crate) struct Segment {
    data: Vec<u8>,
    tail: Vec<u8>,
    line_count: usize,
}

impl Segment {
    pub(crate) fn new(data: Vec<u8>, tail: Vec<u8>, line_count: usize) -> Segment {
        Segment {
            data,
            tail,
            line_count,
        }
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn tail(&self) -> &[u8] {
        &self.tail
    }

    pub(crate) fn line_count(&self) -> usize {
        self.line_count
    }

    /// Decode the segment into exactly `line_count` records
    pub(crate) fn into_records(self, endl: u8) -> Result<Vec<LineRecord>, anyhow::Error> {
        let expected = self.line_count;
        let mut bytes = self.data;
        bytes.extend_from_slice(&self.tail);

        let mut pieces: Vec<&[u8]> = bytes.split(|b| *b == endl).collect();
        if bytes.last() == Some(&endl) || bytes.is_empty() {
            // the piece after the final terminator is not a line
            pieces.pop();
        }

        if pieces.len() != expected {
            return Err(
                FileSortError::Invariant {
                    expected,
                    actual: pieces.len(),
                }.into()
            );
        }

        let mut records = Vec::with_capacity(expected);
        for (n, piece) in pieces.into_iter().enumerate() {
            let record = LineRecord::from_bytes(piece.to_vec(), endl)
                .with_context(|| format!("line within segment: {}", n))?;
            records.push(record);
        }
        Ok(records)
    }
}
