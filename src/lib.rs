//! This crate implements an external sort for text files of `<integer>.<text>` lines, for example
//!
//! ```text
//! 415.Apple
//! 30432.Something something something
//! 1.Apple
//! 32.Cherry is the best
//! 2.Banana is yellow
//! ```
//!
//! Lines are ordered by the text after the first '.', ignoring case, and lines with equal text by
//! the number before it. The example above sorts to
//!
//! ```text
//! 1.Apple
//! 415.Apple
//! 2.Banana is yellow
//! 32.Cherry is the best
//! 30432.Something something something
//! ```
//!
//! Files larger than the available memory are sorted in two phases. The input is read in segments
//! that are sorted in parallel and written to a work folder. The sorted segment files are then
//! merged in pairs, round after round, until a single file is left.
//!
//! A sort can be cancelled at any time with a [cancel::CancellationToken].
//!
//! # Examples
//! ```no_run
//! use std::path::PathBuf;
//! use file_sorter::cancel::CancellationToken;
//! use file_sorter::sort::{Sort, SortOutcome};
//!
//! // optimized for use with Jemalloc
//! use tikv_jemallocator::Jemalloc;
//! #[global_allocator]
//! static GLOBAL: Jemalloc = Jemalloc;
//!
//! fn sort_lines(input: PathBuf, output: PathBuf, work: PathBuf) -> bool {
//!     let mut file_sort = Sort::new(input, output);
//!
//!     // set number of CPU cores the sort will attempt to use. The default is to use all
//!     // available cores.
//!     file_sort.with_tasks(2);
//!
//!     // set the directory for intermediate results. The default is a new directory in the system
//!     // temp dir - std::env::temp_dir(), however, for large files it is recommended to provide a
//!     // dedicated directory, preferably on the same file system as the output result. The
//!     // directory must be empty if it exists.
//!     file_sort.with_work_dir(work);
//!
//!     matches!(file_sort.run(&CancellationToken::new()), SortOutcome::Completed)
//! }
//! ```
//!

pub(crate) mod key;
pub(crate) mod line_stream;
pub(crate) mod merge_command;
pub(crate) mod merger;
pub(crate) mod segment;
pub(crate) mod segment_producer;
pub(crate) mod segment_worker;
pub(crate) mod sequence;
pub(crate) mod sorted_files;
pub(crate) mod work_queue;

pub mod cancel;
pub mod config;
pub mod error;
pub mod generator;
pub mod line_record;
pub mod sort;
