use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use command_executor::command::Command;

use crate::cancel::CancellationToken;
use crate::config::{Config, MERGE_SUFFIX, REMOVE_SUFFIX};
use crate::error::{is_cancelled, FileSortError};
use crate::merger::merge_two_files;

pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Merge two sorted files and leave the result in place of the first one.
///
/// The merged content is written to `<first>.tmp`. Both inputs are then moved aside to
/// `<path>.remove`, the merged file takes the name of the first input and the moved inputs are
/// deleted. A crash in between can leave `.tmp` or `.remove` files in the work folder.
pub(crate) fn merge_pair(first: &Path, second: &Path, config: &Config, cancel: &CancellationToken) -> Result<usize, anyhow::Error> {
    let merged = with_suffix(first, MERGE_SUFFIX);
    let lines = merge_two_files(first, second, &merged, config, cancel)?;

    let first_removed = with_suffix(first, REMOVE_SUFFIX);
    let second_removed = with_suffix(second, REMOVE_SUFFIX);
    rename(first, &first_removed)?;
    rename(second, &second_removed)?;
    rename(&merged, first)?;
    fs::remove_file(&first_removed)
        .with_context(|| format!("Remove {}", first_removed.to_string_lossy()))?;
    fs::remove_file(&second_removed)
        .with_context(|| format!("Remove {}", second_removed.to_string_lossy()))?;
    Ok(lines)
}

fn rename(from: &Path, to: &Path) -> Result<(), anyhow::Error> {
    fs::rename(from, to)
        .with_context(|| format!("Rename {} to {}", from.to_string_lossy(), to.to_string_lossy()))
}

/// One pair of a merge round, executed on the merging thread pool.
///
/// The surviving path is stored in `slots[index]`. The first failure is kept in `failure` and
/// cancels the round so the other pairs stop early.
pub(crate) struct MergeCommand {
    index: usize,
    first: PathBuf,
    second: PathBuf,
    config: Config,
    slots: Arc<Mutex<Vec<Option<PathBuf>>>>,
    failure: Arc<Mutex<Option<anyhow::Error>>>,
    cancel: CancellationToken,
}

impl MergeCommand {
    pub(crate) fn new(
        index: usize,
        first: PathBuf,
        second: PathBuf,
        config: Config,
        slots: Arc<Mutex<Vec<Option<PathBuf>>>>,
        failure: Arc<Mutex<Option<anyhow::Error>>>,
        cancel: CancellationToken,
    ) -> MergeCommand {
        MergeCommand {
            index,
            first,
            second,
            config,
            slots,
            failure,
            cancel,
        }
    }

    fn record_failure(&self, error: anyhow::Error) {
        self.cancel.cancel();
        if let Ok(mut failure) = self.failure.lock() {
            // a real failure wins over the cancellations it caused in other pairs
            let replace = match failure.as_ref() {
                None => true,
                Some(current) => is_cancelled(current) && !is_cancelled(&error),
            };
            if replace {
                *failure = Some(error);
            }
        }
    }
}

impl Command for MergeCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        if self.cancel.is_cancelled() {
            self.record_failure(FileSortError::Cancelled.into());
            return Ok(());
        }

        match merge_pair(&self.first, &self.second, &self.config, &self.cancel) {
            Ok(lines) => {
                log::debug!(
                    "Merged {} and {}, lines: {}",
                    self.first.to_string_lossy(),
                    self.second.to_string_lossy(),
                    lines
                );
                match self.slots.lock() {
                    Ok(mut slots) => slots[self.index] = Some(self.first.clone()),
                    Err(_) => self.record_failure(anyhow::anyhow!("Merge results lock poisoned")),
                }
            }
            Err(e) => {
                log::error!(
                    "Failed to merge {} and {}: {}",
                    self.first.to_string_lossy(),
                    self.second.to_string_lossy(),
                    e
                );
                self.record_failure(e);
            }
        }
        Ok(())
    }
}
