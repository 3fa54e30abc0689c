//! JSON-lines backed record sink

use crate::state::Record;
use crate::storage::traits::{RecordSink, StorageResult};
use crate::storage::{ensure_parent_dir, read_json_lines};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only record file, one JSON record per line
#[derive(Debug)]
pub struct JsonlRecordSink {
    path: PathBuf,
    count: u64,
    last_id: Option<u64>,
}

impl JsonlRecordSink {
    /// Opens the record file at `path`
    ///
    /// Existing records are scanned once so the crawl can continue
    /// numbering after the highest stored id.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let existing: Vec<Record> = read_json_lines(path)?;
        let count = existing.len() as u64;
        let last_id = existing.iter().map(|r| r.id).max();

        tracing::debug!(
            "Opened record sink {} with {} records (last id {:?})",
            path.display(),
            count,
            last_id
        );

        Ok(Self {
            path: path.to_path_buf(),
            count,
            last_id,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonlRecordSink {
    fn append(&mut self, record: &Record) -> StorageResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        ensure_parent_dir(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        self.count += 1;
        self.last_id = Some(self.last_id.map_or(record.id, |last| last.max(record.id)));

        Ok(())
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn last_id(&self) -> Option<u64> {
        self.last_id
    }

    fn read_all(&self) -> StorageResult<Vec<Record>> {
        read_json_lines(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Track;
    use crate::storage::StorageError;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    fn record(id: u64) -> Record {
        Record {
            id,
            genre: Some("Rock".to_string()),
            artist_name: Some("Danzig".to_string()),
            artist_members: ["Glenn Danzig".to_string()].into_iter().collect(),
            artist_websites: BTreeSet::new(),
            album_release_year: Some("1988".to_string()),
            album_title: Some("Danzig".to_string()),
            album_record_label: ["Def American".to_string()].into_iter().collect(),
            album_styles: BTreeSet::new(),
            album_tracks: vec![Track {
                number: "A1".to_string(),
                name: "Twist Of Cain".to_string(),
                track_duration: "4:19".to_string(),
            }],
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("albums.jsonl");
        let mut sink = JsonlRecordSink::open(&path).unwrap();

        assert_eq!(sink.count(), 0);
        assert_eq!(sink.last_id(), None);

        sink.append(&record(1)).unwrap();
        sink.append(&record(2)).unwrap();

        assert_eq!(sink.count(), 2);
        assert_eq!(sink.last_id(), Some(2));
        assert_eq!(sink.read_all().unwrap(), vec![record(1), record(2)]);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_reopen_keeps_last_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("albums.jsonl");

        {
            let mut sink = JsonlRecordSink::open(&path).unwrap();
            sink.append(&record(4)).unwrap();
            sink.append(&record(5)).unwrap();
        }

        let mut sink = JsonlRecordSink::open(&path).unwrap();
        assert_eq!(sink.count(), 2);
        assert_eq!(sink.last_id(), Some(5));

        sink.append(&record(6)).unwrap();
        assert_eq!(sink.read_all().unwrap().len(), 3);
    }

    #[test]
    fn test_written_line_matches_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("albums.jsonl");
        let mut sink = JsonlRecordSink::open(&path).unwrap();
        sink.append(&record(1)).unwrap();

        let line = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();

        assert_eq!(value["id"], 1);
        assert_eq!(value["artist_members"][0], "Glenn Danzig");
        assert_eq!(value["album_record_label"][0], "Def American");
        assert_eq!(value["album_tracks"][0]["number"], "A1");
        assert_eq!(value["album_tracks"][0]["track_duration"], "4:19");
    }

    #[test]
    fn test_corrupt_record_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("albums.jsonl");
        fs::write(&path, "{\"id\": \"one\"}\n").unwrap();

        assert!(matches!(
            JsonlRecordSink::open(&path),
            Err(StorageError::Corrupt { line: 1, .. })
        ));
    }
}
