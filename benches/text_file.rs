use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Error};
use benchmark_rs::benchmarks::Benchmarks;
use benchmark_rs::stopwatch::StopWatch;
use data_encoding::HEXLOWER;
use simple_logger::SimpleLogger;

use file_sorter::cancel::CancellationToken;
use file_sorter::generator::create_test_file;
use file_sorter::sort::Sort;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Clone)]
pub struct BenchmarkConfig {
    files: BTreeMap<usize, PathBuf>,
    bench_results_dir: PathBuf,
    bench_work_dir: PathBuf,
    tasks: usize,
    chunk_size_bytes: usize,
    description: String,
}

impl BenchmarkConfig {
    pub fn new(files: BTreeMap<usize, PathBuf>, bench_results_dir: PathBuf, bench_work_dir: PathBuf, tasks: usize, chunk_size_bytes: usize, description: &str) -> BenchmarkConfig {
        BenchmarkConfig {
            files,
            bench_results_dir,
            bench_work_dir,
            tasks,
            chunk_size_bytes,
            description: description.to_string(),
        }
    }

    pub fn get_input_path(&self, key: usize) -> Result<PathBuf, anyhow::Error> {
        self.files.get(&key).cloned().ok_or_else(|| anyhow!("no input file of {} MB", key))
    }

    pub fn bench_results_dir(&self) -> &PathBuf {
        &self.bench_results_dir
    }

    pub fn bench_work_dir(&self) -> &PathBuf {
        &self.bench_work_dir
    }

    pub fn tasks(&self) -> usize {
        self.tasks
    }

    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size_bytes
    }
}

impl Display for BenchmarkConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "tasks: {}, chunk size: {}, description: {}",
                 self.tasks,
                 self.chunk_size_bytes,
                 self.description,
        )
    }
}

fn temp_file_name(dir: &PathBuf) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

fn cleanup(bench_results_dir: &PathBuf) -> Result<(), anyhow::Error> {
    if bench_results_dir.exists() {
        fs::remove_dir_all(bench_results_dir.clone()).with_context(|| anyhow!("{}", bench_results_dir.to_string_lossy()))?;
    }
    Ok(())
}

fn setup(bench_input_dir: &PathBuf, bench_results_dir: &PathBuf, bench_work_dir: &PathBuf) -> Result<(), anyhow::Error> {
    cleanup(bench_results_dir)?;

    if !bench_input_dir.exists() {
        fs::create_dir_all(bench_input_dir.clone())?;
    }

    if !bench_results_dir.exists() {
        fs::create_dir_all(bench_results_dir.clone())
            .with_context(|| anyhow!("{}", bench_results_dir.to_string_lossy()))?;
    }

    if !bench_work_dir.exists() {
        fs::create_dir_all(bench_work_dir.clone())
            .with_context(|| anyhow!("{}", bench_work_dir.to_string_lossy()))?;
    }

    Ok(())
}

fn create_input_files(count: usize, factor: usize, base_path: PathBuf) -> Result<BTreeMap<usize, PathBuf>, anyhow::Error> {
    let mut files: BTreeMap<usize, PathBuf> = BTreeMap::new();
    for i in 1..=count {
        let size_mb = i * factor;
        let path = base_path.join(PathBuf::from(format!("{}-mb", size_mb)));
        if !path.exists() {
            create_test_file(&path, size_mb as u64, &CancellationToken::new())?;
        }
        files.insert(size_mb, path);
    }
    Ok(files)
}

fn sort(stop_watch: &mut StopWatch, config: BenchmarkConfig, work: usize) -> Result<(), anyhow::Error> {
    stop_watch.pause();
    let input_path = config.get_input_path(work)?;
    let output_path = temp_file_name(config.bench_results_dir());
    let work_path = temp_file_name(config.bench_work_dir());
    log::info!("Start sorting {}", input_path.to_string_lossy());
    stop_watch.resume();
    let mut file_sort = Sort::new(input_path.clone(), output_path.clone());
    file_sort.with_work_dir(work_path);
    file_sort.with_tasks(config.tasks());
    file_sort.with_chunk_size_bytes(config.chunk_size_bytes());
    file_sort.sort(&CancellationToken::new())?;
    stop_watch.pause();
    log::info!("Finish sorting {}", input_path.to_string_lossy());
    fs::remove_file(output_path.clone())
        .with_context(|| anyhow!("{}", output_path.to_string_lossy()))?;
    Ok(())
}

#[test]
fn file_sorter_bench() -> Result<(), Error> {
    SimpleLogger::new().init().unwrap();
    log::info!("Started file_sorter_bench.");

    let bench_input_dir = PathBuf::from("./target/benchmarks/input");
    let bench_results_dir = PathBuf::from("./target/benchmarks/results");
    let bench_work_dir = PathBuf::from("./target/benchmarks/results/work");
    setup(&bench_input_dir, &bench_results_dir, &bench_work_dir)?;

    let small_files = create_input_files(10, 1, bench_input_dir.clone())?;
    let large_files = create_input_files(10, 10, bench_input_dir.clone())?;

    let mut benchmarks = Benchmarks::new("file-sorter");

    for (files, description) in [(&small_files, "small"), (&large_files, "large")] {
        for tasks in [1, 2, 4, 8] {
            for (chunk_size_bytes, chunk_description) in [(2 * 1024 * 1024, "2mb"), (16 * 1024 * 1024, "16mb")] {
                benchmarks.add(
                    &format!("{}-files-{}-tasks-{}-chunks", description, tasks, chunk_description),
                    sort,
                    BenchmarkConfig::new(
                        files.clone(),
                        bench_results_dir.clone(),
                        bench_work_dir.clone(),
                        tasks,
                        chunk_size_bytes,
                        &format!("{} files", description),
                    ),
                    files.keys().cloned().collect(),
                    3,
                    0,
                )?;
            }
        }
    }

    benchmarks.run()?;
    benchmarks.save_to_csv(PathBuf::from("./target/benchmarks/"), true, true)?;
    benchmarks.save_to_json(PathBuf::from("./target/benchmarks/"))?;

    log::info!("Finished file_sorter_bench.");
    Ok(())
}
