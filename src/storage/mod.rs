//! Storage module for the crawl's durable files
//!
//! This module owns everything that survives a restart:
//! - The pending link queue (one `{"link": ...}` object per line)
//! - The append-only record file (one record per line)
//! - The optional page cursor checkpoint
//!
//! Every mutation is written through to disk before the call returns.

mod checkpoint;
mod link_queue;
mod record_sink;
mod traits;

pub use checkpoint::{CheckpointFile, CursorCheckpoint};
pub use link_queue::JsonlLinkQueue;
pub use record_sink::JsonlRecordSink;
pub use traits::{LinkQueue, RecordSink, StorageError, StorageResult};

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A pending reference to one catalog entry
///
/// The reference is the relative link found on a results page
/// (e.g. `/release/111`); it is stored under the `link` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(rename = "link")]
    pub reference: String,
}

impl QueueEntry {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// Replaces `path` with `contents` via a temporary file and a rename
///
/// Readers observe either the old or the new contents, never a mix.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> StorageResult<()> {
    ensure_parent_dir(path)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    Ok(())
}

/// Creates the parent directory of `path` if it has one
pub(crate) fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Reads a JSON-lines file, skipping blank lines
///
/// A missing file reads as empty. A line that does not parse is reported
/// as corruption with its 1-based line number.
pub(crate) fn read_json_lines<T>(path: &Path) -> StorageResult<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|e| StorageError::Corrupt {
            path: path.display().to_string(),
            line: index + 1,
            message: e.to_string(),
        })?;
        items.push(item);
    }

    Ok(items)
}
