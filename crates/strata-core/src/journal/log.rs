//! Edit log sinks.

use super::record::JournalRecord;
use crate::error::{Result, VolumeError};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Durable, ordered sink for registry state changes.
///
/// `append` returns once the record is persisted; records are replayed in
/// append order.
pub trait EditLog: Send + Sync {
    fn append(&self, record: &JournalRecord) -> Result<()>;
}

/// Edit log that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryEditLog {
    records: Mutex<Vec<JournalRecord>>,
}

impl MemoryEditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records appended so far, in order.
    pub fn records(&self) -> Vec<JournalRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EditLog for MemoryEditLog {
    fn append(&self, record: &JournalRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| VolumeError::Internal("Failed to acquire edit log lock".into()))?
            .push(record.clone());
        Ok(())
    }
}

/// Edit log stored as one JSON document per line.
///
/// Each append is flushed and synced before returning.
pub struct JsonLinesEditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesEditLog {
    /// Open (or create) a journal file for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Opened journal at {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record of a journal file in order.
    ///
    /// A missing file reads as an empty journal. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<JournalRecord>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| VolumeError::Upstream {
                message: format!(
                    "Failed to parse journal {} line {}: {}",
                    path.display(),
                    index + 1,
                    e
                ),
                source: Some(Box::new(e)),
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl EditLog for JsonLinesEditLog {
    fn append(&self, record: &JournalRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| VolumeError::Internal("Failed to acquire journal lock".into()))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        debug!("Journaled {} to {}", record.op_name(), self.path.display());
        Ok(())
    }
}
