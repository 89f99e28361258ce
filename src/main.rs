use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use file_sorter::cancel::CancellationToken;
use file_sorter::error::is_cancelled;
use file_sorter::generator::create_test_file;
use file_sorter::sort::{Sort, SortOutcome};
use log::LevelFilter;
use simple_logger::SimpleLogger;

const SUCCESS: i32 = 0;
const ABORTED: i32 = 1;
const FAILURE: i32 = -1;

/// Sort large text files of `<integer>.<text>` lines
#[derive(Parser)]
#[command(name = "file-sorter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output file for the create and sort commands
    #[arg(global = true, short, long)]
    output: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(global = true, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a file of random lines
    Create {
        /// Approximate size of the file in MB
        #[arg(short, long)]
        size: u64,
    },

    /// Sort a file
    Sort {
        /// File to sort
        #[arg(short, long)]
        input: PathBuf,

        /// Folder for intermediate files, must be empty if it exists
        #[arg(short, long)]
        work_folder: Option<PathBuf>,

        /// Number of sorting and merging threads, 0 uses all cores
        #[arg(long, default_value_t = 0)]
        tasks: usize,

        /// Segment size in bytes
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Check that a file is sorted
    Check {
        /// File to check
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match LevelFilter::from_str(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Invalid log level {}: {}", cli.log_level, e);
            return exit_code(FAILURE);
        }
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cancel = CancellationToken::new();
    let handler_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::warn!("Interrupted, cancelling");
        handler_cancel.cancel();
    }) {
        log::warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let code = match run(cli.command, cli.output, &cancel) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            FAILURE
        }
    };
    exit_code(code)
}

fn run(command: Commands, output: Option<PathBuf>, cancel: &CancellationToken) -> Result<i32, anyhow::Error> {
    match command {
        Commands::Create { size } => {
            let output = output.ok_or_else(|| anyhow!("--output is required"))?;
            match create_test_file(&output, size, cancel) {
                Ok(_) => Ok(SUCCESS),
                Err(e) if is_cancelled(&e) => {
                    log::error!("The operation was aborted");
                    Ok(ABORTED)
                }
                Err(e) => Err(e),
            }
        }
        Commands::Sort { input, work_folder, tasks, chunk_size } => {
            let output = output.ok_or_else(|| anyhow!("--output is required"))?;
            let mut file_sort = Sort::new(input, output);
            if let Some(work_folder) = work_folder {
                file_sort.with_work_dir(work_folder);
            }
            file_sort.with_tasks(tasks);
            if let Some(chunk_size) = chunk_size {
                file_sort.with_chunk_size_bytes(chunk_size);
            }
            match file_sort.run(cancel) {
                SortOutcome::Completed => Ok(SUCCESS),
                SortOutcome::Aborted => Ok(ABORTED),
                SortOutcome::Failed(_) => Ok(FAILURE),
            }
        }
        Commands::Check { input } => {
            let sorted = Sort::new(input.clone(), PathBuf::new()).check()?;
            if sorted {
                log::info!("{} is sorted", input.to_string_lossy());
                Ok(SUCCESS)
            } else {
                log::info!("{} is not sorted", input.to_string_lossy());
                Ok(FAILURE)
            }
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    // -1 maps to 255 like a process exit status
    ExitCode::from(code as u8)
}
