use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::CacheError;

pub const CACHE_FILE_NAME: &str = "issue_type_cache";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconRecord {
    pub issuetype_id: String,
    pub icon_path: PathBuf,
}

/// Append-only record file, one JSON object per line.
///
/// Appends hold an exclusive advisory lock and reads a shared one, so a
/// reader never sees half of a record written by another process.
#[derive(Debug)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns every parseable record in file order. A missing file is empty.
    pub fn read_all(&self) -> Result<Vec<IconRecord>, CacheError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        FileExt::lock_shared(&file).map_err(|source| self.io_error(source))?;

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(&file).lines().enumerate() {
            let line = line.map_err(|source| self.io_error(source))?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Some(record) => records.push(record),
                None => tracing::debug!(
                    path = %self.path.display(),
                    line = idx + 1,
                    "skipping unreadable icon cache record"
                ),
            }
        }
        // lock is released when `file` is closed
        Ok(records)
    }

    pub fn append(&self, record: &IconRecord) -> Result<(), CacheError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        FileExt::lock_exclusive(&file).map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))?;
        file.flush().map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Parses one line of the record file.
///
/// Lines that are not JSON objects are read as `<issuetype_id>:<icon_path>`,
/// the format older caches were written in.
pub fn parse_line(line: &str) -> Option<IconRecord> {
    let trimmed = line.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str::<IconRecord>(trimmed)
            .ok()
            .filter(|record| {
                !record.issuetype_id.is_empty() && !record.icon_path.as_os_str().is_empty()
            });
    }

    let (id, path) = trimmed.split_once(':')?;
    let (id, path) = (id.trim(), path.trim());
    if id.is_empty() || path.is_empty() {
        return None;
    }
    Some(IconRecord {
        issuetype_id: id.to_string(),
        icon_path: PathBuf::from(path),
    })
}
