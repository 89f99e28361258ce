use std::path::{Path, PathBuf};

use anyhow::{anyhow, Error};
use file_sorter::cancel::CancellationToken;
use file_sorter::generator::create_test_file;
use file_sorter::sort::{Sort, SortOutcome};

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn sort_lines(input_path: &Path, output_path: &Path, cancel: &CancellationToken) -> Result<(), Error> {
    // segments of 2 MiB sorted on all available cores
    let file_sort = Sort::new(input_path.to_path_buf(), output_path.to_path_buf());
    match file_sort.run(cancel) {
        SortOutcome::Completed => Ok(()),
        SortOutcome::Aborted => Err(anyhow!("sort aborted")),
        SortOutcome::Failed(e) => Err(e),
    }
}

fn sort_lines_small_segments(input_path: &Path, output_path: &Path, work_path: &Path, cancel: &CancellationToken) -> Result<(), Error> {
    let mut file_sort = Sort::new(input_path.to_path_buf(), output_path.to_path_buf());
    file_sort.with_work_dir(work_path.to_path_buf());
    file_sort.with_tasks(2);
    file_sort.with_chunk_size_bytes(64 * 1024);
    file_sort.sort(cancel)
}

// cargo run -r --example sort_text_file
pub fn main() -> Result<(), Error> {
    let input_path = PathBuf::from("./target/random-10.dat");
    let sorted_path = PathBuf::from("./target/sorted-10.dat");
    let small_segments_path = PathBuf::from("./target/small-segments-10.dat");
    let work_path = PathBuf::from("./target/sort-work");
    let cancel = CancellationToken::new();

    create_test_file(&input_path, 10, &cancel)?;
    sort_lines(&input_path, &sorted_path, &cancel)?;
    sort_lines_small_segments(&input_path, &small_segments_path, &work_path, &cancel)?;

    let sorted = Sort::new(sorted_path, PathBuf::new()).check()?;
    let small_segments_sorted = Sort::new(small_segments_path, PathBuf::new()).check()?;
    println!("sorted: {}, sorted with small segments: {}", sorted, small_segments_sorted);

    Ok(())
}
