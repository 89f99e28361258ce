use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context};

use crate::cancel::CancellationToken;
use crate::config::{platform_endl, Config};
use crate::error::{is_cancelled, FileSortError};
use crate::line_record::LineRecord;
use crate::merger::SortedSegmentsMerger;
use crate::segment_producer::SegmentProducer;
use crate::segment_worker::SegmentWorker;
use crate::sequence::SequenceNumber;
use crate::sorted_files::SortedFiles;
use crate::work_queue;

/// Result of [Sort::run]
#[derive(Debug)]
pub enum SortOutcome {
    /// The output holds every input line in sorted order
    Completed,
    /// The sort was cancelled, partial results were removed
    Aborted,
    /// The sort failed, partial results were removed
    Failed(anyhow::Error),
}

/// Read `source` in segments and sort each segment into its own file in the configured work
/// folder.
///
/// One thread reads the source while `config.tasks()` workers sort and write segments. The
/// reader stalls when `config.queue_size()` segments are waiting. Returns the paths of the
/// sorted segment files in no particular order.
///
/// The first failing worker stops the others. Its error is returned in preference to the
/// cancellations it caused.
pub fn split_to_sorted_segments<R: Read>(source: R, config: &Config, cancel: &CancellationToken) -> Result<Vec<PathBuf>, anyhow::Error> {
    log::info!("Start splitting input into sorted segments, tasks: {}, segment size: {} bytes", config.tasks(), config.chunk_size_bytes());
    let abort = cancel.child();
    let sequence = SequenceNumber::new();
    let sorted_files = SortedFiles::new();
    let (writer, reader) = work_queue::bounded(config.queue_size());
    let producer = SegmentProducer::with_capacity(source, config.chunk_size_bytes(), config.endl(), config.rw_buf_size());

    let (produced, worked) = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(config.tasks());
        for id in 0..config.tasks() {
            let worker = SegmentWorker::new(config, &sequence, &sorted_files);
            let reader = reader.clone();
            let abort = &abort;
            let handle = thread::Builder::new()
                .name(format!("sorting-{}", id))
                .spawn_scoped(scope, move || {
                    let result = worker.run(reader, abort);
                    if result.is_err() {
                        abort.cancel();
                    }
                    result
                })
                .context("Failed to start sorting worker");
            match handle {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    abort.cancel();
                    return (Err(e), Vec::new());
                }
            }
        }
        drop(reader);

        let produced = producer.produce(writer, &abort);
        if produced.is_err() {
            abort.cancel();
        }

        let worked: Vec<Result<usize, anyhow::Error>> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|_| Err(anyhow!("Sorting worker panicked"))))
            .collect();
        (produced, worked)
    });

    let mut cancelled = None;
    let mut segments = 0;
    for result in worked.into_iter().chain(std::iter::once(produced.map(|_| 0))) {
        match result {
            Ok(count) => segments += count,
            Err(e) if is_cancelled(&e) => {
                cancelled.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }
    if let Some(e) = cancelled {
        return Err(e);
    }

    let paths = sorted_files.into_paths()?;
    log::info!("Finished splitting input, sorted segments: {}", segments);
    Ok(paths)
}

/// Merge sorted segment files into `target`, replacing it if it exists.
///
/// The segment files are consumed: merged pairs are deleted and the last file is renamed to
/// `target`. On failure or cancellation intermediate files stay in the work folder.
pub fn merge_segments(sorted: Vec<PathBuf>, target: &Path, config: &Config, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
    SortedSegmentsMerger::new(config).merge(sorted, target, cancel)
}

/// Sort a text file of `<integer>.<text>` lines
///
/// Lines are ordered by the text after the first '.', ignoring case, and then by the number
/// before it.
///
/// # Examples
/// ```no_run
/// use std::path::PathBuf;
/// use file_sorter::cancel::CancellationToken;
/// use file_sorter::sort::Sort;
///
/// fn sort_file(input: PathBuf, output: PathBuf, work: PathBuf) -> Result<(), anyhow::Error> {
///     let mut file_sort = Sort::new(input, output);
///     // the work folder must be empty or missing, a missing folder is created and removed
///     // after the sort. The default is a fresh folder in std::env::temp_dir()
///     file_sort.with_work_dir(work);
///     // set number of sorting and merging threads. The default is to use all available cores.
///     file_sort.with_tasks(2);
///     file_sort.sort(&CancellationToken::new())
/// }
/// ```
pub struct Sort {
    input: PathBuf,
    output: PathBuf,
    work_dir: Option<PathBuf>,
    tasks: usize,
    chunk_size_bytes: usize,
    file_prefix: String,
    rw_buf_size: usize,
    endl: u8,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// * intermediate files go to a new folder in std::env::temp_dir()
    /// * all CPU cores are used
    /// * input is read in segments of 2 MiB
    /// * sorted segments are named `input_<n>`
    /// * files are read and written with 64 KiB buffers
    /// * lines end with the last byte of the platform line ending
    pub fn new(input: PathBuf, output: PathBuf) -> Sort {
        Sort {
            input,
            output,
            work_dir: None,
            tasks: 0,
            chunk_size_bytes: 2 * 1024 * 1024,
            file_prefix: "input".to_string(),
            rw_buf_size: 65536,
            endl: platform_endl(),
        }
    }

    /// Set the folder for intermediate files. It must be empty if it exists. A missing folder is
    /// created and removed when the sort is done.
    pub fn with_work_dir(&mut self, work_dir: PathBuf) {
        self.work_dir = Some(work_dir);
    }

    /// Set the number of tasks. The default is zero which will result in using all system cores
    pub fn with_tasks(&mut self, tasks: usize) {
        self.tasks = tasks;
    }

    /// The input will be read in segments of 'chunk_size_bytes' respecting line boundaries
    pub fn with_chunk_size_bytes(&mut self, chunk_size_bytes: usize) {
        self.chunk_size_bytes = chunk_size_bytes;
    }

    /// The input will be read in segments of 'chunk_size_mb' MiB respecting line boundaries
    pub fn with_chunk_size_mb(&mut self, chunk_size_mb: usize) {
        self.chunk_size_bytes = chunk_size_mb * 1024 * 1024;
    }

    /// Set the name prefix of sorted segment files
    pub fn with_file_prefix(&mut self, file_prefix: String) {
        self.file_prefix = file_prefix;
    }

    /// Set the read and write buffer size used for intermediate files
    pub fn with_rw_buf_size(&mut self, rw_buf_size: usize) {
        self.rw_buf_size = rw_buf_size;
    }

    /// Set line ending byte - CRLF input is supported with '\n'
    pub fn with_endl(&mut self, endl: u8) {
        self.endl = endl;
    }

    pub(crate) fn create_config(&self, work_dir: PathBuf) -> Config {
        Config::new(work_dir)
            .with_tasks(self.tasks)
            .with_chunk_size_bytes(self.chunk_size_bytes)
            .with_file_prefix(self.file_prefix.clone())
            .with_rw_buf_size(self.rw_buf_size)
            .with_endl(self.endl)
    }

    /// Sort the input file into the output file.
    ///
    /// Fails with [FileSortError::Precondition] when the work folder is not empty, and with
    /// [FileSortError::Cancelled] when `cancel` fires. Intermediate files are removed in all
    /// cases, a partial output is not.
    pub fn sort(&self, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        log::info!("Start sorting {} into {}", self.input.to_string_lossy(), self.output.to_string_lossy());
        match &self.work_dir {
            Some(work_dir) => {
                let created = ensure_empty_dir(work_dir)?;
                let result = self.sort_in(work_dir, cancel);
                if created {
                    remove_path(work_dir);
                } else if result.is_err() {
                    clear_dir(work_dir);
                }
                result
            }
            None => {
                let tmp_dir = tempfile::Builder::new()
                    .prefix("file-sorter-")
                    .tempdir()
                    .context("Failed to create work folder")?;
                // the folder and whatever is left in it is removed on drop
                self.sort_in(tmp_dir.path(), cancel)
            }
        }
    }

    /// Like [Sort::sort], and remove the output when the sort did not complete
    pub fn run(&self, cancel: &CancellationToken) -> SortOutcome {
        match self.sort(cancel) {
            Ok(()) => {
                log::info!("File {} sorted and saved to {}", self.input.to_string_lossy(), self.output.to_string_lossy());
                SortOutcome::Completed
            }
            Err(e) => {
                remove_path(&self.output);
                if is_cancelled(&e) {
                    log::error!("The operation was aborted");
                    SortOutcome::Aborted
                } else {
                    log::error!("Failed to sort {}: {:#}", self.input.to_string_lossy(), e);
                    SortOutcome::Failed(e)
                }
            }
        }
    }

    fn sort_in(&self, work_dir: &Path, cancel: &CancellationToken) -> Result<(), anyhow::Error> {
        let config = self.create_config(work_dir.to_path_buf());
        let input = File::open(&self.input)
            .with_context(|| format!("path: {}", self.input.to_string_lossy()))?;
        let sorted = split_to_sorted_segments(input, &config, cancel)?;
        merge_segments(sorted, &self.output, &config, cancel)?;
        log::info!("Finish sorting {}", self.input.to_string_lossy());
        Ok(())
    }

    /// Check that the input file is sorted
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        Self::internal_check(&self.input, self.endl)
    }

    pub(crate) fn internal_check(path: &Path, endl: u8) -> Result<bool, anyhow::Error> {
        let mut reader = BufReader::new(
            File::open(path).with_context(|| format!("path: {}", path.to_string_lossy()))?
        );
        let mut previous: Option<LineRecord> = None;
        let mut n = 0;
        loop {
            let mut buf = Vec::new();
            if reader.read_until(endl, &mut buf)? == 0 {
                break;
            }
            n += 1;
            let current = LineRecord::from_bytes(buf, endl)
                .with_context(|| format!("path: {}, line: {}", path.to_string_lossy(), n))?;
            if let Some(previous) = &previous {
                if previous > &current {
                    log::info!("{} is not sorted at line {}", path.to_string_lossy(), n);
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }
}

/// Returns true if the folder was created
fn ensure_empty_dir(path: &Path) -> Result<bool, anyhow::Error> {
    if path.exists() {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("path: {}", path.to_string_lossy()))?;
        if entries.next().is_some() {
            return Err(FileSortError::Precondition(format!("The folder must be empty: {}", path.to_string_lossy())).into());
        }
        Ok(false)
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("path: {}", path.to_string_lossy()))?;
        Ok(true)
    }
}

fn remove_path(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    };
    if let Err(e) = result {
        log::warn!("Unable to delete: {}. Error: {}", path.to_string_lossy(), e);
    }
}

fn clear_dir(path: &Path) {
    match fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries.flatten() {
                remove_path(&entry.path());
            }
        }
        Err(e) => log::warn!("Unable to clear: {}. Error: {}", path.to_string_lossy(), e),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{Cursor, Read};

    use crate::cancel::CancellationToken;
    use crate::config::Config;
    use crate::error::{is_cancelled, FileSortError};
    use crate::sort::{ensure_empty_dir, merge_segments, split_to_sorted_segments, Sort, SortOutcome};

    const INPUT: &str = "415.Apple\n30432.Something something something\n1.Apple\n32.Cherry is the best\n2.Banana is yellow\n";

    #[test]
    fn test_split_into_segments() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = Config::new(dir.path().to_path_buf())
            .with_tasks(3)
            .with_chunk_size_bytes(20);
        let paths = split_to_sorted_segments(Cursor::new(INPUT), &config, &CancellationToken::new())?;
        assert!(paths.len() > 1);

        let mut lines = Vec::new();
        for path in &paths {
            let content = fs::read_to_string(path)?;
            assert!(content.ends_with('\n'));
            lines.extend(content.lines().map(|l| l.to_string()));
        }
        let mut expected: Vec<String> = INPUT.lines().map(|l| l.to_string()).collect();
        lines.sort();
        expected.sort();
        assert_eq!(lines, expected);
        Ok(())
    }

    #[test]
    fn test_split_and_merge() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = Config::new(dir.path().join("work"))
            .with_tasks(2)
            .with_chunk_size_bytes(16);
        fs::create_dir(config.work_dir())?;
        let target = dir.path().join("sorted.txt");
        let cancel = CancellationToken::new();
        let paths = split_to_sorted_segments(Cursor::new(INPUT), &config, &cancel)?;
        merge_segments(paths, &target, &config, &cancel)?;
        assert_eq!(
            fs::read_to_string(&target)?,
            "1.Apple\n415.Apple\n2.Banana is yellow\n32.Cherry is the best\n30432.Something something something\n"
        );
        assert_eq!(fs::read_dir(config.work_dir())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_split_malformed_input() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = Config::new(dir.path().to_path_buf())
            .with_tasks(2)
            .with_chunk_size_bytes(8);
        let input = "1.a\n2.b\n3.c\nnot a record\n4.d\n5.e\n";
        let error = split_to_sorted_segments(Cursor::new(input), &config, &CancellationToken::new()).unwrap_err();
        assert!(matches!(error.downcast_ref::<FileSortError>(), Some(FileSortError::Parse { .. })), "{:?}", error);
        Ok(())
    }

    #[test]
    fn test_split_cancelled() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = Config::new(dir.path().to_path_buf()).with_tasks(2);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let error = split_to_sorted_segments(Cursor::new(INPUT), &config, &cancel).unwrap_err();
        assert!(is_cancelled(&error));
        Ok(())
    }

    // cancels the token once `limit` bytes have been read
    struct CancellingReader {
        inner: Cursor<Vec<u8>>,
        read: usize,
        limit: usize,
        cancel: CancellationToken,
    }

    impl Read for CancellingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.read += n;
            if self.read >= self.limit {
                self.cancel.cancel();
            }
            Ok(n)
        }
    }

    #[test]
    fn test_split_cancelled_while_reading() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = Config::new(dir.path().to_path_buf())
            .with_tasks(2)
            .with_chunk_size_bytes(64)
            .with_rw_buf_size(64);
        let mut input = Vec::new();
        for i in 0..2000 {
            input.extend_from_slice(format!("{}.line {}\n", i, i % 37).as_bytes());
        }
        let total = input.len();
        let cancel = CancellationToken::new();
        let source = CancellingReader {
            inner: Cursor::new(input),
            read: 0,
            limit: total / 3,
            cancel: cancel.clone(),
        };
        let error = split_to_sorted_segments(source, &config, &cancel).unwrap_err();
        assert!(is_cancelled(&error), "{:?}", error);
        Ok(())
    }

    #[test]
    fn test_ensure_empty_dir() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("work");
        assert!(ensure_empty_dir(&missing)?);
        assert!(!ensure_empty_dir(&missing)?);
        fs::write(missing.join("leftover"), "1.a\n")?;
        let error = ensure_empty_dir(&missing).unwrap_err();
        assert!(matches!(error.downcast_ref::<FileSortError>(), Some(FileSortError::Precondition(_))));
        Ok(())
    }

    #[test]
    fn test_sort_removes_created_work_dir() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.txt");
        let output = dir.path().join("output.txt");
        let work = dir.path().join("work");
        fs::write(&input, INPUT)?;

        let mut file_sort = Sort::new(input.clone(), output.clone());
        file_sort.with_work_dir(work.clone());
        file_sort.with_chunk_size_bytes(10);
        file_sort.with_tasks(2);
        file_sort.sort(&CancellationToken::new())?;
        assert!(!work.exists());
        assert!(Sort::new(output, input).check()?);
        Ok(())
    }

    #[test]
    fn test_run_aborted() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.txt");
        let output = dir.path().join("output.txt");
        let work = dir.path().join("work");
        fs::write(&input, INPUT)?;
        fs::create_dir(&work)?;

        let mut file_sort = Sort::new(input, output.clone());
        file_sort.with_work_dir(work.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(file_sort.run(&cancel), SortOutcome::Aborted));
        assert!(!output.exists());
        assert!(work.exists());
        assert_eq!(fs::read_dir(&work)?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_run_failed_on_missing_input() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let file_sort = Sort::new(dir.path().join("missing.txt"), dir.path().join("output.txt"));
        assert!(matches!(file_sort.run(&CancellationToken::new()), SortOutcome::Failed(_)));
        Ok(())
    }

    #[test]
    fn test_check() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let sorted = dir.path().join("sorted.txt");
        let unsorted = dir.path().join("unsorted.txt");
        fs::write(&sorted, "1.apple\n2.Apple\n1.banana\n")?;
        fs::write(&unsorted, INPUT)?;
        assert!(Sort::new(sorted, dir.path().join("unused")).check()?);
        assert!(!Sort::new(unsorted, dir.path().join("unused")).check()?);
        Ok(())
    }
}
