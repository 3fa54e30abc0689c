//! Statistics over the crawl's durable files
//!
//! This module provides functionality for summarizing the record file and
//! the pending link queue without running a crawl.

use crate::storage::{LinkQueue, RecordSink};
use crate::ChainError;
use std::collections::HashMap;

/// Label used for records without a genre
const UNKNOWN_GENRE: &str = "(none)";

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Links waiting in the queue
    pub pending_links: usize,

    /// Records in the record file
    pub records_written: u64,

    /// Highest record id written
    pub last_record_id: Option<u64>,

    /// Tracks across all records
    pub total_tracks: u64,

    /// Records whose cross-reference page yielded no members
    pub records_without_members: u64,

    /// Record count per genre
    pub records_by_genre: HashMap<String, u64>,
}

/// Loads statistics from the link queue and record sink
pub fn load_statistics(
    queue: &dyn LinkQueue,
    sink: &dyn RecordSink,
) -> Result<CrawlStatistics, ChainError> {
    let records = sink.read_all()?;

    let mut records_by_genre = HashMap::new();
    let mut total_tracks = 0;
    let mut records_without_members = 0;

    for record in &records {
        let genre = record.genre.as_deref().unwrap_or(UNKNOWN_GENRE);
        *records_by_genre.entry(genre.to_string()).or_insert(0) += 1;

        total_tracks += record.album_tracks.len() as u64;
        if record.artist_members.is_empty() {
            records_without_members += 1;
        }
    }

    Ok(CrawlStatistics {
        pending_links: queue.len(),
        records_written: records.len() as u64,
        last_record_id: records.iter().map(|r| r.id).max(),
        total_tracks,
        records_without_members,
        records_by_genre,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Records written: {}", stats.records_written);
    match stats.last_record_id {
        Some(id) => println!("  Last record id: {}", id),
        None => println!("  Last record id: -"),
    }
    println!("  Pending links: {}", stats.pending_links);
    println!("  Total tracks: {}", stats.total_tracks);
    println!();

    if !stats.records_by_genre.is_empty() {
        println!("Records by Genre:");
        // Sort genres by count (descending)
        let mut genre_counts: Vec<_> = stats.records_by_genre.iter().collect();
        genre_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (genre, count) in genre_counts {
            let percentage = (*count as f64 / stats.records_written as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", genre, count, percentage);
        }
        println!();
    }

    let with_members = stats.records_written - stats.records_without_members;
    let coverage = if stats.records_written > 0 {
        (with_members as f64 / stats.records_written as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Member Coverage: {:.1}% ({} / {} records list members)",
        coverage, with_members, stats.records_written
    );
}
