//! Content-addressed store of recognized text.
//!
//! Keys are hex SHA-256 digests of the raw image bytes, so the same scan is
//! recognized once regardless of its file name. Entries never change once
//! written: `put_if_absent` on an existing key is a no-op.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::error::{ClassifyError, Result};

pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub trait OcrCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Returns `true` when this call stored the text.
    fn put_if_absent(&self, key: &str, text: &str) -> Result<bool>;

    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    text: String,
}

/// One `<hash>.json` file per entry.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl OcrCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let data = match fs::read_to_string(self.entry_path(key)) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ClassifyError::cache_io(key, err)),
        };
        let record: CacheRecord = serde_json::from_str(&data)
            .map_err(|err| ClassifyError::cache_io(key, io::Error::new(io::ErrorKind::InvalidData, err)))?;
        Ok(Some(record.text))
    }

    fn put_if_absent(&self, key: &str, text: &str) -> Result<bool> {
        let path = self.entry_path(key);
        if path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir).map_err(|err| ClassifyError::cache_io(key, err))?;

        let data = serde_json::to_string(&CacheRecord {
            text: text.to_string(),
        })
        .map_err(|err| ClassifyError::cache_io(key, io::Error::other(err)))?;

        // Staged next to the target so the rename never crosses filesystems.
        let mut staged =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|err| ClassifyError::cache_io(key, err))?;
        staged
            .write_all(data.as_bytes())
            .map_err(|err| ClassifyError::cache_io(key, err))?;

        match staged.persist_noclobber(&path) {
            Ok(_) => {
                debug!(key, "cached recognized text");
                Ok(true)
            }
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(ClassifyError::cache_io(key, err.error)),
        }
    }

    fn clear(&self) -> Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(ClassifyError::cache_io(self.dir.display().to_string(), err)),
        };
        for entry in entries {
            let path = entry
                .map_err(|err| ClassifyError::cache_io(self.dir.display().to_string(), err))?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .map_err(|err| ClassifyError::cache_io(path.display().to_string(), err))?;
            }
        }
        Ok(())
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(key: &str) -> ClassifyError {
    ClassifyError::cache_io(key, io::Error::other("cache lock poisoned"))
}

impl OcrCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned(key))?;
        Ok(entries.get(key).cloned())
    }

    fn put_if_absent(&self, key: &str, text: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned(key))?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), text.to_string());
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().map_err(|_| poisoned("*"))?.clear();
        Ok(())
    }
}
