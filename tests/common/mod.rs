use std::cmp::Ordering;
use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;

use data_encoding::HEXLOWER;
use file_sorter::cancel::CancellationToken;
use file_sorter::generator::generate;
use file_sorter::line_record::compare;

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    } else {
        println!("Results directory exists at {:?}", results_dir_path);
    }
}

#[allow(dead_code)]
pub fn read_lines(path: PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

/// Write a file of random lines slightly larger than `size` bytes
#[allow(dead_code)]
pub fn create_fixture(path: &PathBuf, size: u64) -> Result<(), anyhow::Error> {
    generate(File::create(path)?, size, &CancellationToken::new())?;
    Ok(())
}

#[allow(dead_code)]
pub fn assert_sorted(lines: &[String]) -> Result<(), anyhow::Error> {
    for pair in lines.windows(2) {
        assert_ne!(compare(&pair[0], &pair[1])?, Ordering::Greater, "{} > {}", pair[0], pair[1]);
    }
    Ok(())
}

#[allow(dead_code)]
pub fn assert_same_lines(mut expected: Vec<String>, mut actual: Vec<String>) {
    expected.sort();
    actual.sort();
    assert_eq!(expected, actual);
}
