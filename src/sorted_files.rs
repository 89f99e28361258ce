use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::anyhow;

/// Paths of the sorted segment files written so far, in no particular order.
#[derive(Debug, Default)]
pub(crate) struct SortedFiles {
    paths: Mutex<Vec<PathBuf>>,
}

impl SortedFiles {
    pub(crate) fn new() -> SortedFiles {
        SortedFiles::default()
    }

    pub(crate) fn publish(&self, path: PathBuf) -> Result<(), anyhow::Error> {
        self.paths
            .lock()
            .map_err(|e| anyhow!("Sorted files lock poisoned: {}", e))?
            .push(path);
        Ok(())
    }

    pub(crate) fn into_paths(self) -> Result<Vec<PathBuf>, anyhow::Error> {
        self.paths
            .into_inner()
            .map_err(|e| anyhow!("Sorted files lock poisoned: {}", e))
    }
}
