pub mod persistent;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use persistent::{IconRecord, RecordFile, CACHE_FILE_NAME};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("icon cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode icon cache record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Issue-type id to local icon file, backed by a record file in `dir`.
#[derive(Debug)]
pub struct IconCache {
    dir: PathBuf,
    file: RecordFile,
    entries: HashMap<String, PathBuf>,
}

impl IconCache {
    /// Opens the cache in `dir`, creating the directory when needed. The
    /// directory is resolved to an absolute path so recorded icon paths do
    /// not depend on the working directory.
    ///
    /// Records whose icon file no longer exists are dropped. When an id
    /// appears more than once the last usable record wins.
    pub fn load(dir: &Path) -> Result<Self, CacheError> {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|source| CacheError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            tracing::debug!(dir = %dir.display(), "created icon cache directory");
        }

        let dir = std::fs::canonicalize(dir).map_err(|source| CacheError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let file = RecordFile::new(dir.join(CACHE_FILE_NAME));
        let mut entries = HashMap::new();
        for record in file.read_all()? {
            if record.icon_path.exists() {
                entries.insert(record.issuetype_id, record.icon_path);
            } else {
                tracing::debug!(
                    issuetype_id = %record.issuetype_id,
                    path = %record.icon_path.display(),
                    "dropping stale icon cache entry"
                );
            }
        }

        tracing::debug!(entries = entries.len(), "icon cache loaded");
        Ok(Self {
            dir,
            file,
            entries,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contains(&self, issuetype_id: &str) -> bool {
        self.entries.contains_key(issuetype_id)
    }

    pub fn get(&self, issuetype_id: &str) -> Option<&Path> {
        self.entries.get(issuetype_id).map(PathBuf::as_path)
    }

    /// Persists a new record and makes it visible to lookups. Existing
    /// records are never rewritten.
    pub fn append(&mut self, issuetype_id: &str, icon_path: &Path) -> Result<(), CacheError> {
        self.file.append(&IconRecord {
            issuetype_id: issuetype_id.to_string(),
            icon_path: icon_path.to_path_buf(),
        })?;
        self.entries
            .insert(issuetype_id.to_string(), icon_path.to_path_buf());
        Ok(())
    }
}
