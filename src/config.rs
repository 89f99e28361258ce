use std::path::{Path, PathBuf};

/// Suffix of the file a pair of sorted segments is merged into
pub(crate) const MERGE_SUFFIX: &str = ".tmp";
/// Suffix marking merged inputs that are about to be deleted
pub(crate) const REMOVE_SUFFIX: &str = ".remove";

/// The last byte of the platform line ending, '\n' for both "\n" and "\r\n"
pub(crate) fn platform_endl() -> u8 {
    let newline = if cfg!(windows) { "\r\n" } else { "\n" };
    newline.as_bytes()[newline.len() - 1]
}

/// Engine configuration shared by the split and the merge phases.
#[derive(Clone, Debug)]
pub struct Config {
    work_dir: PathBuf,
    file_prefix: String,
    tasks: usize,
    queue_size: usize,
    chunk_size_bytes: usize,
    rw_buf_size: usize,
    endl: u8,
}

impl Config {
    /// Create a configuration with default settings writing intermediate files into `work_dir`
    ///
    /// * sorted segments are named `input_<n>`
    /// * all CPU cores are used
    /// * the input is read in segments of 2 MiB
    /// * files are read and written with 64 KiB buffers
    /// * lines end with the last byte of the platform line ending
    pub fn new(work_dir: PathBuf) -> Config {
        let tasks = num_cpus::get();
        Config {
            work_dir,
            file_prefix: "input".to_string(),
            tasks,
            queue_size: tasks,
            chunk_size_bytes: 2 * 1024 * 1024,
            rw_buf_size: 65536,
            endl: platform_endl(),
        }
    }

    pub fn with_file_prefix(mut self, file_prefix: String) -> Config {
        self.file_prefix = file_prefix;
        self
    }

    /// A value of 0 selects the number of available CPU cores. The queue between the reader and
    /// the sorting workers has as many slots as there are workers.
    pub fn with_tasks(mut self, tasks: usize) -> Config {
        self.tasks = if tasks == 0 { num_cpus::get() } else { tasks };
        self.queue_size = self.tasks;
        self
    }

    pub fn with_chunk_size_bytes(mut self, chunk_size_bytes: usize) -> Config {
        self.chunk_size_bytes = chunk_size_bytes.max(1);
        self
    }

    pub fn with_rw_buf_size(mut self, rw_buf_size: usize) -> Config {
        self.rw_buf_size = rw_buf_size.max(1);
        self
    }

    pub fn with_endl(mut self, endl: u8) -> Config {
        self.endl = endl;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    pub fn tasks(&self) -> usize {
        self.tasks
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size_bytes
    }

    pub fn rw_buf_size(&self) -> usize {
        self.rw_buf_size
    }

    pub fn endl(&self) -> u8 {
        self.endl
    }

    pub(crate) fn segment_path(&self, number: u64) -> PathBuf {
        self.work_dir.join(format!("{}_{}", self.file_prefix, number))
    }
}
