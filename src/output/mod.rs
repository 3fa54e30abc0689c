//! Output module for reporting on crawl results
//!
//! This module handles:
//! - Summarizing the record file and the pending link queue
//! - Printing those statistics for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
