//! Filesystem Store Module
//!
//! Persists each cache entry as one file in a dedicated cache directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::store::{sanitize_key, CacheStore};

/// File extensions this store considers cache-owned.
///
/// Clear only touches these, and writes remove same-key siblings carrying
/// them, so foreign files sharing the directory are never affected.
const MANAGED_EXTENSIONS: &[&str] = &["json", "yaml"];

// == Filesystem Store ==
/// Stores one blob per key as `<dir>/<sanitized key>.<extension>`.
///
/// The extension is fixed at construction from the cache's serialization
/// format. Reads probe every managed extension so entries survive a format
/// switch on disk; whether they still decode is the codec's business.
pub struct FilesystemStore {
    /// Dedicated cache directory
    dir: PathBuf,
    /// Extension for newly written files, without the dot
    extension: String,
}

impl FilesystemStore {
    // == Constructor ==
    /// Creates a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Arguments
    /// * `dir` - Dedicated cache directory
    /// * `extension` - File extension for new entries, without the dot
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let meta = std::fs::metadata(&dir)?;
        if !meta.is_dir() {
            return Err(StorageError::UnusableDirectory(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        Ok(Self {
            dir,
            extension: extension.to_string(),
        })
    }

    /// Validates that the cache directory still exists and is writable.
    ///
    /// Runs before every write so a directory deleted or locked down after
    /// construction fails loudly instead of scattering I/O errors.
    async fn ensure_dir(&self) -> Result<(), StorageError> {
        let meta = match tokio::fs::metadata(&self.dir).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::UnusableDirectory(format!(
                    "{} does not exist",
                    self.dir.display()
                )));
            }
            Err(err) => return Err(StorageError::Io(err)),
        };

        if !meta.is_dir() {
            return Err(StorageError::UnusableDirectory(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(StorageError::UnusableDirectory(format!(
                "{} is not writable",
                self.dir.display()
            )));
        }
        Ok(())
    }

    /// Path of the entry file for `key` under a given extension.
    fn entry_path(&self, key: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", sanitize_key(key), extension))
    }

    /// Extensions to probe for a key, the store's own first.
    fn candidate_extensions(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.extension.as_str()).chain(
            MANAGED_EXTENSIONS
                .iter()
                .copied()
                .filter(move |ext| *ext != self.extension),
        )
    }

    fn is_managed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == self.extension || MANAGED_EXTENSIONS.contains(&ext))
            .unwrap_or(false)
    }
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn write(&self, key: &str, blob: &[u8], _ttl_seconds: u64) -> Result<(), StorageError> {
        self.ensure_dir().await?;

        // One file per key: drop same-key siblings written under another
        // managed extension before this one lands
        for ext in self.candidate_extensions().skip(1) {
            match tokio::fs::remove_file(self.entry_path(key, ext)).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(StorageError::Io(err)),
            }
        }

        tokio::fs::write(self.entry_path(key, &self.extension), blob).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        for ext in self.candidate_extensions() {
            match tokio::fs::read(self.entry_path(key, ext)).await {
                Ok(blob) => return Ok(Some(blob)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StorageError::Io(err)),
            }
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut removed = false;
        for ext in self.candidate_extensions() {
            match tokio::fs::remove_file(self.entry_path(key, ext)).await {
                Ok(()) => removed = true,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(StorageError::Io(err)),
            }
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(StorageError::Io(err)),
        };

        let mut removed = 0usize;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if item.file_type().await?.is_file() && self.is_managed(&path) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            } else {
                debug!("Leaving foreign item {} untouched", path.display());
            }
        }

        info!("Cleared {} cache files from {}", removed, self.dir.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
