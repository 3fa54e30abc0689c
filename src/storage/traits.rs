//! Storage traits and error types
//!
//! This module defines the trait interface for the link queue and the
//! record sink, and the errors their backends report.

use crate::state::Record;
use crate::storage::QueueEntry;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt line {line} in {path}: {message}")]
    Corrupt {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable FIFO of catalog entries waiting to be processed
///
/// The persisted queue doubles as the crash-recovery checkpoint: after a
/// restart, whatever it holds is exactly the set of entries not yet
/// dispatched.
pub trait LinkQueue {
    /// Appends entries in order after any pending ones
    fn push(&mut self, entries: &[QueueEntry]) -> StorageResult<()>;

    /// Removes and returns the earliest pending entry
    ///
    /// The removal is persisted before this returns. `None` means the
    /// queue is empty.
    fn pop_front(&mut self) -> StorageResult<Option<QueueEntry>>;

    /// Number of pending entries
    fn len(&self) -> usize;

    /// Returns true if no entries are pending
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending entries in processing order
    fn pending(&self) -> Vec<QueueEntry>;

    /// Drops every pending entry
    fn clear(&mut self) -> StorageResult<()>;
}

/// Append-only store of completed records
pub trait RecordSink {
    /// Appends one record; it is durable once this returns
    fn append(&mut self, record: &Record) -> StorageResult<()>;

    /// Number of records stored
    fn count(&self) -> u64;

    /// Highest record id stored, if any
    fn last_id(&self) -> Option<u64>;

    /// Reads every stored record back
    fn read_all(&self) -> StorageResult<Vec<Record>>;
}
