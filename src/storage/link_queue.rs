//! JSON-lines backed link queue

use crate::storage::traits::{LinkQueue, StorageResult};
use crate::storage::{ensure_parent_dir, read_json_lines, write_atomically, QueueEntry};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Link queue persisted as one `{"link": ...}` object per line
///
/// Pending entries are mirrored in memory. `push` appends to the file;
/// `pop_front` rewrites it without the first entry.
///
/// An entry popped here is gone from disk before its pages are fetched. If
/// the process dies after the pop but before the entry's record reaches the
/// record file, that entry is lost; it is neither retried nor recorded.
#[derive(Debug)]
pub struct JsonlLinkQueue {
    path: PathBuf,
    pending: VecDeque<QueueEntry>,
}

impl JsonlLinkQueue {
    /// Opens the queue at `path`, loading any pending entries
    ///
    /// A missing file is an empty queue. An unreadable or malformed file is
    /// an error: pending work cannot be determined safely.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let pending: VecDeque<QueueEntry> = read_json_lines(path)?.into();

        tracing::debug!(
            "Opened link queue {} with {} pending entries",
            path.display(),
            pending.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            pending,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next entry to be popped, without removing it
    pub fn peek(&self) -> Option<&QueueEntry> {
        self.pending.front()
    }

    fn rewrite(&self) -> StorageResult<()> {
        let mut contents = String::new();
        for entry in &self.pending {
            contents.push_str(&serde_json::to_string(entry)?);
            contents.push('\n');
        }
        write_atomically(&self.path, contents.as_bytes())
    }
}

/// Writes `bytes` through `writer` onto the end of `file`
///
/// A write that fails partway is cut back off, so the file never ends in a
/// torn line.
fn append_durably<W: Write>(file: &File, writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    let previous_len = file.metadata()?.len();

    let written = writer
        .write_all(bytes)
        .and_then(|()| writer.flush())
        .and_then(|()| file.sync_data());

    if let Err(e) = written {
        if let Err(truncate) = file.set_len(previous_len) {
            tracing::error!("Could not remove partial queue append: {}", truncate);
        }
        return Err(e);
    }

    Ok(())
}

impl LinkQueue for JsonlLinkQueue {
    fn push(&mut self, entries: &[QueueEntry]) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut lines = String::new();
        for entry in entries {
            lines.push_str(&serde_json::to_string(entry)?);
            lines.push('\n');
        }

        ensure_parent_dir(&self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        append_durably(&file, &mut &file, lines.as_bytes())?;

        self.pending.extend(entries.iter().cloned());
        tracing::trace!(
            "Queued {} entries, {} pending",
            entries.len(),
            self.pending.len()
        );

        Ok(())
    }

    fn pop_front(&mut self) -> StorageResult<Option<QueueEntry>> {
        let Some(entry) = self.pending.pop_front() else {
            return Ok(None);
        };

        if let Err(e) = self.rewrite() {
            // Disk still holds the entry; keep memory in agreement
            self.pending.push_front(entry);
            return Err(e);
        }

        Ok(Some(entry))
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn pending(&self) -> Vec<QueueEntry> {
        self.pending.iter().cloned().collect()
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.pending.clear();
        self.rewrite()
    }
}
