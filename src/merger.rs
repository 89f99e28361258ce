use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool_builder::ThreadPoolBuilder;

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::line_stream::LineStream;
use crate::merge_command::MergeCommand;

/// Merge two sorted files into `output`, returns the number of lines written.
///
/// The smaller head goes first. On equal keys the line from `first` wins, so the merge is stable
/// with respect to the order of the inputs. Cancellation is checked for every line.
pub(crate) fn merge_two_files(first: &Path, second: &Path, output: &Path, config: &Config, cancel: &CancellationToken) -> Result<usize, anyhow::Error> {
    let mut left = LineStream::new(first, config.rw_buf_size(), config.endl())?;
    let mut right = LineStream::new(second, config.rw_buf_size(), config.endl())?;
    let file = File::create(output).with_context(|| format!("path: {}", output.to_string_lossy()))?;
    let mut writer = BufWriter::with_capacity(config.rw_buf_size(), file);
    let endl = [config.endl()];

    let mut merged_len: usize = 0;
    loop {
        cancel.check()?;
        let take_left = match (left.head(), right.head()) {
            (None, None) => break,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(l), Some(r)) => l <= r,
        };
        let stream = if take_left { &mut left } else { &mut right };
        if let Some(record) = stream.advance()? {
            writer.write_all(record.line().as_bytes())
                .and_then(|_| writer.write_all(&endl))
                .with_context(|| format!("path: {}", output.to_string_lossy()))?;
            merged_len += 1;
        }
    }
    writer.flush().with_context(|| format!("path: {}", output.to_string_lossy()))?;
    log::debug!(
        "Merged {} and {} into {}, lines: {}",
        left.path().to_string_lossy(),
        right.path().to_string_lossy(),
        output.to_string_lossy(),
        merged_len
    );
    Ok(merged_len)
}

/// Reduces sorted segment files to a single sorted file by merging them in pairs, round after
/// round, until one file is left.
pub(crate) struct SortedSegmentsMerger<'a> {
    config: &'a Config,
}

impl<'a> SortedSegmentsMerger<'a> {
    pub(crate) fn new(config: &'a Config) -> SortedSegmentsMerger<'a> {
        SortedSegmentsMerger {
            config,
        }
    }

    pub(crate) fn merge(&self, sorted_files: Vec<PathBuf>, target: &Path, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        log::info!("Start merging {} sorted files into {}", sorted_files.len(), target.to_string_lossy());
        if sorted_files.is_empty() {
            cancel.check()?;
            File::create(target).with_context(|| format!("path: {}", target.to_string_lossy()))?;
            log::info!("Nothing to merge, created empty {}", target.to_string_lossy());
            return Ok(());
        }

        let mut files = sorted_files;
        let mut round = 0;
        while files.len() > 1 {
            cancel.check()?;
            round += 1;
            files = self.merge_round(files, round, cancel)?;
        }

        cancel.check()?;
        let last = files.remove(0);
        Self::move_to_target(&last, target)?;
        log::info!("Finished merging after {} rounds, result: {}", round, target.to_string_lossy());
        Ok(())
    }

    /// Merge consecutive pairs in parallel, a file without a pair passes to the next round as is.
    /// The result keeps the order of the pairs.
    fn merge_round(&self, files: Vec<PathBuf>, round: usize, cancel: &CancellationToken) -> Result<Vec<PathBuf>, anyhow::Error> {
        let pairs: Vec<Vec<PathBuf>> = files.chunks(2).map(|pair| pair.to_vec()).collect();
        log::info!("Merge round {}, files: {}, pairs: {}", round, files.len(), files.len() / 2);

        let slots: Arc<Mutex<Vec<Option<PathBuf>>>> = Arc::new(Mutex::new(vec![None; pairs.len()]));
        let failure: Arc<Mutex<Option<anyhow::Error>>> = Arc::new(Mutex::new(None));
        let round_cancel = cancel.child();
        let tasks = self.config.tasks().min(files.len() / 2).max(1);

        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let mut merging_pool = thread_pool_builder
            .with_name("merging".to_string())
            .with_tasks(tasks)
            .with_queue_size(tasks)
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()
            .context("Failed to create merging thread pool")?;

        for (index, mut pair) in pairs.into_iter().enumerate() {
            if pair.len() == 1 {
                let single = pair.remove(0);
                let mut slots = slots.lock().map_err(|e| anyhow!("{}", e))?;
                slots[index] = Some(single);
            } else {
                let second = pair.remove(1);
                let first = pair.remove(0);
                let merge_command = Box::new(
                    MergeCommand::new(
                        index,
                        first,
                        second,
                        self.config.clone(),
                        slots.clone(),
                        failure.clone(),
                        round_cancel.clone(),
                    )
                );
                merging_pool.submit(merge_command);
            }
        }

        merging_pool.shutdown();
        merging_pool.join()?;

        if let Some(e) = failure.lock().map_err(|e| anyhow!("{}", e))?.take() {
            return Err(e.context(format!("Merge round {} failed", round)));
        }

        let mut slots = slots.lock().map_err(|e| anyhow!("{}", e))?;
        let next: Option<Vec<PathBuf>> = slots.iter_mut().map(|slot| slot.take()).collect();
        next.ok_or_else(|| anyhow!("Merge round {} did not produce a result for every pair", round))
    }

    fn move_to_target(path: &Path, target: &Path) -> Result<(), anyhow::Error> {
        if target.exists() {
            fs::remove_file(target).with_context(|| format!("Remove {}", target.to_string_lossy()))?;
        }
        if let Err(rename_error) = fs::rename(path, target) {
            // rename does not work across file systems
            log::warn!("Rename {} to {} failed: {}, copying instead", path.to_string_lossy(), target.to_string_lossy(), rename_error);
            fs::copy(path, target)
                .with_context(|| format!("Rename {} to {}: {}", path.to_string_lossy(), target.to_string_lossy(), rename_error))?;
            fs::remove_file(path).with_context(|| format!("Remove {}", path.to_string_lossy()))?;
        }
        Ok(())
    }
}
