use std::time::Duration;

use anyhow::anyhow;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::cancel::CancellationToken;

// how often a blocked put or take wakes up to look at the cancellation token
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Create a fixed capacity FIFO queue.
///
/// [QueueWriter::put] blocks while the queue is full and [QueueReader::take] blocks while it is
/// empty. Closing the writer lets readers drain what is left and then stop.
pub(crate) fn bounded<T>(capacity: usize) -> (QueueWriter<T>, QueueReader<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
    (QueueWriter { sender }, QueueReader { receiver })
}

pub(crate) struct QueueWriter<T> {
    sender: Sender<T>,
}

impl<T> QueueWriter<T> {
    pub(crate) fn put(&self, item: T, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        let mut item = item;
        loop {
            cancel.check()?;
            match self.sender.send_timeout(item, POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => item = returned,
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(anyhow!("Work queue has no consumers left"));
                }
            }
        }
    }

    /// No more items will be added
    pub(crate) fn close(self) {
        drop(self.sender);
    }
}

pub(crate) struct QueueReader<T> {
    receiver: Receiver<T>,
}

impl<T> Clone for QueueReader<T> {
    fn clone(&self) -> Self {
        QueueReader {
            receiver: self.receiver.clone(),
        }
    }
}

impl<T> QueueReader<T> {
    /// Returns `None` once the queue is closed and every item has been taken
    pub(crate) fn take(&self, cancel: &CancellationToken) -> Result<Option<T>, anyhow::Error> {
        loop {
            cancel.check()?;
            match self.receiver.recv_timeout(POLL_INTERVAL) {
                Ok(item) => return Ok(Some(item)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}
