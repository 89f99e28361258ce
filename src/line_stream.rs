use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::line_record::LineRecord;

/// A sorted file read one record at a time, with the next record parked in `head`.
#[derive(Debug)]
pub(crate) struct LineStream {
    path: PathBuf,
    reader: BufReader<File>,
    head: Option<LineRecord>,
    endl: u8,
    line: usize,
}

impl LineStream {
    pub(crate) fn new(path: &Path, buf_size: usize, endl: u8) -> Result<LineStream, anyhow::Error> {
        let file = File::open(path).with_context(|| format!("path: {}", path.to_string_lossy()))?;
        let mut stream = LineStream {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(buf_size, file),
            head: None,
            endl,
            line: 0,
        };
        stream.head = stream.read_record()?;
        Ok(stream)
    }

    pub(crate) fn head(&self) -> Option<&LineRecord> {
        self.head.as_ref()
    }

    /// Take the current head and read the next record in its place
    pub(crate) fn advance(&mut self) -> Result<Option<LineRecord>, anyhow::Error> {
        let next = self.read_record()?;
        Ok(std::mem::replace(&mut self.head, next))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn read_record(&mut self) -> Result<Option<LineRecord>, anyhow::Error> {
        let mut buf = Vec::new();
        let bytes = self.reader.read_until(self.endl, &mut buf)
            .with_context(|| format!("path: {}, line: {}", self.path.to_string_lossy(), self.line))?;
        if bytes == 0 {
            return Ok(None);
        }
        self.line += 1;
        let record = LineRecord::from_bytes(buf, self.endl)
            .with_context(|| format!("path: {}, line: {}", self.path.to_string_lossy(), self.line))?;
        Ok(Some(record))
    }
}
