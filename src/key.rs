use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::FileSortError;

pub(crate) const SEPARATOR: char = '.';

/// Sort key of a `<integer>.<text>` line.
///
/// Keys compare by the case folded text first and by the number second, both ascending.
/// Case folding maps each character to its single upper case character, characters without one
/// are kept as is, so "ß" does not equal "SS".
#[derive(Debug, Clone)]
pub(crate) struct Key {
    text: String,
    number: i32,
}

impl Key {
    /// Parse a line without its terminator
    pub(crate) fn new(line: &str) -> Result<Key, anyhow::Error> {
        if line.is_empty() {
            return Err(FileSortError::parse(line, "Input cannot be empty").into());
        }

        let (number, text) = line.split_once(SEPARATOR)
            .ok_or_else(|| FileSortError::parse(line, "Input does not contain a separator character"))?;

        let number = i32::from_str(number.trim())
            .map_err(|e| FileSortError::parse(line, &format!("Left part must be a valid number: {e}")))?;

        Ok(
            Key {
                text: text.chars().map(fold_case).collect(),
                number,
            }
        )
    }

    #[cfg(test)]
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    #[cfg(test)]
    pub(crate) fn number(&self) -> i32 {
        self.number
    }
}

fn fold_case(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

impl Eq for Key {}

impl PartialEq<Self> for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.as_str().cmp(other.text.as_str())
            .then_with(|| self.number.cmp(&other.number))
    }
}
