use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::Context;

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::line_record::LineRecord;
use crate::segment::Segment;
use crate::sequence::SequenceNumber;
use crate::sorted_files::SortedFiles;
use crate::work_queue::QueueReader;

/// Takes segments off the queue, sorts them and persists each one as a sorted segment file.
pub(crate) struct SegmentWorker<'a> {
    config: &'a Config,
    sequence: &'a SequenceNumber,
    sorted_files: &'a SortedFiles,
}

impl<'a> SegmentWorker<'a> {
    pub(crate) fn new(config: &'a Config, sequence: &'a SequenceNumber, sorted_files: &'a SortedFiles) -> SegmentWorker<'a> {
        SegmentWorker {
            config,
            sequence,
            sorted_files,
        }
    }

    /// Work until the queue is closed and drained, returns the number of segments sorted
    pub(crate) fn run(&self, queue: QueueReader<Segment>, cancel: &CancellationToken) -> Result<usize, anyhow::Error> {
        let mut count = 0;
        while let Some(segment) = queue.take(cancel)? {
            self.sort_segment(segment)?;
            count += 1;
        }
        log::debug!("Sorting worker done, thread: {}, segments: {}", thread::current().name().unwrap_or("unnamed"), count);
        Ok(count)
    }

    pub(crate) fn sort_segment(&self, segment: Segment) -> Result<PathBuf, anyhow::Error> {
        let line_count = segment.line_count();
        let mut records = segment.into_records(self.config.endl())?;
        records.sort_unstable();

        let path = self.config.segment_path(self.sequence.next());
        Self::write_sorted_segment(&path, records, self.config)?;
        log::debug!(
            "Sorted segment, thread: {}, lines: {}, path: {}",
            thread::current().name().unwrap_or("unnamed"),
            line_count,
            path.to_string_lossy()
        );
        self.sorted_files.publish(path.clone())?;
        Ok(path)
    }

    fn write_sorted_segment(path: &Path, records: Vec<LineRecord>, config: &Config) -> Result<(), anyhow::Error> {
        let file = File::create(path).with_context(|| format!("path: {}", path.to_string_lossy()))?;
        let mut buf_writer = BufWriter::with_capacity(config.rw_buf_size(), file);
        let endl = [config.endl()];
        for line_record in records {
            buf_writer.write_all(line_record.line().as_bytes())
                .and_then(|_| buf_writer.write_all(&endl))
                .with_context(|| format!("path: {}", path.to_string_lossy()))?;
        }
        buf_writer.flush().with_context(|| format!("path: {}", path.to_string_lossy()))?;
        Ok(())
    }
}
