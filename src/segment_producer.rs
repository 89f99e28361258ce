use std::io::{BufRead, BufReader, ErrorKind, Read};

use anyhow::Context;

use crate::cancel::CancellationToken;
use crate::segment::Segment;
use crate::work_queue::QueueWriter;

/// Reads the input once, front to back, and cuts it into [Segment]s of `jump` bytes, extended
/// to the end of the line the cut falls into.
pub(crate) struct SegmentProducer<R: Read> {
    reader: BufReader<R>,
    jump: usize,
    endl: u8,
    pos: u64,
}

impl<R: Read> SegmentProducer<R> {
    #[cfg(test)]
    pub(crate) fn new(source: R, jump: usize, endl: u8) -> SegmentProducer<R> {
        SegmentProducer::with_capacity(source, jump, endl, 8192)
    }

    pub(crate) fn with_capacity(source: R, jump: usize, endl: u8, buf_size: usize) -> SegmentProducer<R> {
        SegmentProducer {
            reader: BufReader::with_capacity(buf_size, source),
            jump: jump.max(1),
            endl,
            pos: 0,
        }
    }

    /// Push every segment into `queue` and close it.
    ///
    /// Returns the number of segments produced. Cancellation is checked before each segment is
    /// read and while waiting for room in the queue. A cancelled producer does not close the
    /// queue; dropping the writer disconnects it.
    pub(crate) fn produce(mut self, queue: QueueWriter<Segment>, cancel: &CancellationToken) -> Result<usize, anyhow::Error> {
        let mut count = 0;
        loop {
            cancel.check()?;
            match self.next().transpose()? {
                None => break,
                Some(segment) => {
                    log::debug!("Produced segment {}, bytes: {}, lines: {}",
                        count,
                        segment.data().len() + segment.tail().len(),
                        segment.line_count(),
                    );
                    queue.put(segment, cancel)?;
                    count += 1;
                }
            }
        }
        queue.close();
        log::info!("Finished reading input, segments: {}, bytes: {}", count, self.pos);
        Ok(count)
    }

    fn fill(&mut self, buffer: &mut [u8]) -> Result<usize, anyhow::Error> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).with_context(|| format!("Failed to read input at position: {}", self.pos)),
            }
        }
        Ok(filled)
    }

    fn read_segment(&mut self) -> Result<Option<Segment>, anyhow::Error> {
        let mut data = vec![0_u8; self.jump];
        let filled = self.fill(&mut data)?;
        if filled == 0 {
            return Ok(None);
        }
        data.truncate(filled);
        self.pos += filled as u64;

        let endl = self.endl;
        let mut line_count = data.iter().filter(|b| **b == endl).count();
        let mut tail = Vec::new();
        if data[filled - 1] != endl {
            // the cut fell inside a line, the rest of it belongs to this segment
            self.reader.read_until(endl, &mut tail)
                .with_context(|| format!("Failed to read input at position: {}", self.pos))?;
            self.pos += tail.len() as u64;
            line_count += 1;
        }

        Ok(Some(Segment::new(data, tail, line_count)))
    }
}

impl<R: Read> Iterator for SegmentProducer<R> {
    type Item = Result<Segment, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_segment().transpose()
    }
}
