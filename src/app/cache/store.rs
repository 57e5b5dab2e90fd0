//! Raw JSON payload storage
//!
//! Payloads are written with the temp file + rename pattern so an
//! interrupted run never leaves a truncated file that a later run would
//! mistake for a cache hit.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::value::RawValue;
use tokio::fs;
use tracing::debug;

use crate::constants::files;
use crate::errors::{CacheError, CacheResult};

use super::key::CacheKey;

/// Durable map from [`CacheKey`] to the JSON payload the API returned
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the cached payloads
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache file for a key
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Load a cached payload
    ///
    /// Returns `Ok(None)` when nothing is cached under `key`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` for any read failure other than a missing
    /// file and `CacheError::Corrupt` if the file is not valid JSON.
    pub async fn load(&self, key: &CacheKey) -> CacheResult<Option<Box<RawValue>>> {
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache miss: {}", path.display());
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let payload = RawValue::from_string(text)
            .map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;
        debug!("Cache hit: {}", path.display());
        Ok(Some(payload))
    }

    /// Persist a payload under `key`, replacing any previous entry
    ///
    /// # Errors
    ///
    /// Returns `CacheError::DirectoryNotAccessible` if the cache directory
    /// cannot be created and `CacheError::Io` if writing fails.
    pub async fn save(&self, key: &CacheKey, payload: &RawValue) -> CacheResult<()> {
        self.ensure_directory_exists().await?;

        let path = self.path_for(key);
        let temp_path = Self::temp_path(&path);

        fs::write(&temp_path, payload.get().as_bytes())
            .await
            .map_err(|source| CacheError::Io {
                path: temp_path.clone(),
                source,
            })?;

        if let Err(source) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::Io { path, source });
        }

        debug!(
            "Cached {} bytes to {}",
            payload.get().len(),
            path.display()
        );
        Ok(())
    }

    /// Whether a payload is cached under `key`
    pub async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    async fn ensure_directory_exists(&self) -> CacheResult<()> {
        match fs::metadata(&self.dir).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(CacheError::DirectoryNotAccessible {
                path: self.dir.clone(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.dir)
                    .await
                    .map_err(|_| CacheError::DirectoryNotAccessible {
                        path: self.dir.clone(),
                    })?;
                debug!("Created cache directory: {}", self.dir.display());
                Ok(())
            }
            Err(source) => Err(CacheError::Io {
                path: self.dir.clone(),
                source,
            }),
        }
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(files::TEMP_FILE_SUFFIX);
        PathBuf::from(name)
    }
}
