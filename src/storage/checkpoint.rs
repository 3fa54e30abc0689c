//! Page cursor checkpoint file

use crate::storage::traits::StorageResult;
use crate::storage::{write_atomically, StorageError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted position of the page cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorCheckpoint {
    /// Search page currently being drained
    pub page: u32,

    /// Last sequence id handed out
    pub sequence: u64,

    /// Every entry of `page` has been popped from the link queue
    #[serde(default)]
    pub drained: bool,
}

impl CursorCheckpoint {
    /// Page a restarted crawl should search when the link queue is empty
    pub fn resume_page(&self) -> u32 {
        if self.drained {
            self.page + 1
        } else {
            self.page
        }
    }
}

/// Small JSON file holding a [`CursorCheckpoint`]
#[derive(Debug, Clone)]
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Reads the checkpoint; `None` if it was never written
    pub fn load(&self) -> StorageResult<Option<CursorCheckpoint>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                path: self.path.display().to_string(),
                line: e.line(),
                message: e.to_string(),
            })
    }

    /// Replaces the checkpoint atomically
    pub fn save(&self, checkpoint: CursorCheckpoint) -> StorageResult<()> {
        let json = serde_json::to_vec(&checkpoint)?;
        write_atomically(&self.path, &json)
    }

    /// Removes the checkpoint file if present
    pub fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
