use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use rand::Rng;

use crate::cancel::CancellationToken;
use crate::error::FileSortError;

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const TEXT_LEN: usize = 150;
const MAX_NUMBER: u32 = 10000;

/// Largest test file accepted by [create_test_file], in MB
pub const MAX_TEST_FILE_MB: u64 = 100 * 1024 * 2024;

/// Write random `<number>.<text>` lines to `writer` until more than `max_size` bytes are written.
///
/// Numbers are in `1..10000`, the text is 150 ASCII letters. Returns the number of bytes written.
pub fn generate<W: Write>(writer: W, max_size: u64, cancel: &CancellationToken) -> Result<u64, anyhow::Error> {
    let mut rng = rand::thread_rng();
    let mut writer = BufWriter::new(writer);
    let mut line = String::with_capacity(TEXT_LEN + 8);
    let mut written: u64 = 0;
    loop {
        cancel.check()?;
        line.clear();
        line.push_str(&rng.gen_range(1..MAX_NUMBER).to_string());
        line.push('.');
        for _ in 0..TEXT_LEN {
            line.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
        written += line.len() as u64;
        if written > max_size {
            break;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Create a file of random lines at `path`, slightly larger than `size_mb` MiB.
///
/// A size outside `1..=MAX_TEST_FILE_MB` fails before `path` is touched. A file left behind by a
/// failed or cancelled write is removed.
pub fn create_test_file(path: &Path, size_mb: u64, cancel: &CancellationToken) -> Result<u64, anyhow::Error> {
    if !(1..=MAX_TEST_FILE_MB).contains(&size_mb) {
        return Err(
            FileSortError::Precondition(format!("size must be between 1 and {} MB, got: {}", MAX_TEST_FILE_MB, size_mb)).into()
        );
    }
    log::info!("Start creating {} MB test file {}", size_mb, path.to_string_lossy());
    let file = File::create(path).with_context(|| format!("path: {}", path.to_string_lossy()))?;
    let written = match generate(file, size_mb * 1024 * 1024, cancel) {
        Ok(written) => written,
        Err(e) => {
            if let Err(remove_error) = fs::remove_file(path) {
                log::warn!("Unable to delete: {}. Error: {}", path.to_string_lossy(), remove_error);
            }
            return Err(e.context(format!("path: {}", path.to_string_lossy())));
        }
    };
    log::info!("Finished creating {}, bytes: {}", path.to_string_lossy(), written);
    Ok(written)
}
