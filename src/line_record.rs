use std::cmp::Ordering;

use anyhow::Context;

use crate::key::Key;

/// Drop the `endl` terminator of a raw line, and a single '\r' before it when `endl` is '\n'
pub(crate) fn trim_line_end(line: &mut Vec<u8>, endl: u8) {
    if line.last() == Some(&endl) {
        line.pop();
    }
    if endl == b'\n' && line.last() == Some(&b'\r') {
        line.pop();
    }
}

/// A `<integer>.<text>` line together with its parsed [Key].
///
/// The line is kept without its terminator, see [trim_line_end].
#[derive(Debug)]
pub(crate) struct LineRecord {
    line: String,
    key: Key,
}

impl LineRecord {
    pub(crate) fn new(line: String) -> Result<LineRecord, anyhow::Error> {
        let key = Key::new(&line)?;
        Ok(
            LineRecord {
                line,
                key,
            }
        )
    }

    /// Decode a raw line read up to and including `endl`
    pub(crate) fn from_bytes(mut raw: Vec<u8>, endl: u8) -> Result<LineRecord, anyhow::Error> {
        trim_line_end(&mut raw, endl);
        let line = String::from_utf8(raw).context("line is not valid UTF-8")?;
        LineRecord::new(line)
    }

    pub(crate) fn line(&self) -> &str {
        &self.line
    }
}

impl Eq for LineRecord {}

impl PartialEq<Self> for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl PartialOrd<Self> for LineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Compare two `<integer>.<text>` lines.
///
/// The text after the first '.' is compared ignoring case, ties are broken by the number before
/// it. Fails with [crate::error::FileSortError::Parse] when either line is malformed.
pub fn compare(a: &str, b: &str) -> Result<Ordering, anyhow::Error> {
    Ok(Key::new(without_newline(a))?.cmp(&Key::new(without_newline(b))?))
}

fn without_newline(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Like [compare], with an absent line ordered before any present line.
pub fn compare_optional(a: Option<&str>, b: Option<&str>) -> Result<Ordering, anyhow::Error> {
    match (a, b) {
        (None, None) => Ok(Ordering::Equal),
        (None, Some(_)) => Ok(Ordering::Less),
        (Some(_), None) => Ok(Ordering::Greater),
        (Some(a), Some(b)) => compare(a, b),
    }
}
