// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! JSON-file cache tier.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cellar_tier::{CacheEntry, CacheKey, CacheTier, Error, KeyPattern, TierUsage};
use tokio::fs;

use crate::layout::{entry_path, is_entry_file, namespace_dir, temp_path};

/// A cache tier that persists entries as JSON files under a root directory.
///
/// The root is created on first write and recreated by [`clear`](CacheTier::clear).
///
/// # Examples
///
/// ```no_run
/// use std::time::{Duration, SystemTime};
///
/// use cellar_disk::DurableTier;
/// use cellar_tier::{CacheEntry, CacheKey, CacheTier};
///
/// # async fn example() -> Result<(), cellar_tier::Error> {
/// let tier = DurableTier::new("/var/cache/relay");
/// let key = CacheKey::namespaced("stripe", "balance");
///
/// tier.insert(&key, CacheEntry::new(&key, serde_json::json!(42), SystemTime::now(), Duration::from_secs(60))).await?;
/// assert!(tier.get(&key).await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DurableTier {
    root: PathBuf,
}

impl DurableTier {
    /// Creates a tier rooted at `root`. No I/O happens until the first operation.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file that holds `key`.
    #[must_use]
    pub fn path_of(&self, key: &CacheKey) -> PathBuf {
        entry_path(&self.root, key)
    }

    /// Creates the root directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the directory cannot be created.
    pub async fn ensure_root(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.root).await.map_err(|e| Error::io(&self.root, e))
    }

    async fn read_entry(path: &Path) -> Result<Option<CacheEntry>, Error> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };
        CacheEntry::from_json_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::malformed(path, e))
    }

    async fn remove_file(path: &Path) -> Result<bool, Error> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    async fn remove_dir(path: &Path) -> Result<(), Error> {
        match fs::remove_dir_all(path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(Error::io(path, e)),
            _ => Ok(()),
        }
    }

    /// Lists every entry file below `dir`, depth first. A missing directory has no entries.
    async fn entry_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut listing = match fs::read_dir(&current).await {
                Ok(listing) => listing,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(&current, e)),
            };

            while let Some(child) = listing.next_entry().await.map_err(|e| Error::io(&current, e))? {
                let file_type = child.file_type().await.map_err(|e| Error::io(child.path(), e))?;
                let path = child.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && is_entry_file(&path) {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    /// Removes every entry file for which `doomed` returns `true`.
    ///
    /// `doomed` receives the decoded entry, or `None` when the file is malformed.
    async fn remove_files_where(&self, mut doomed: impl FnMut(&Path, Option<&CacheEntry>) -> bool) -> Result<usize, Error> {
        let mut removed = 0;
        for path in Self::entry_files(&self.root).await? {
            let entry = match Self::read_entry(&path).await {
                Ok(Some(entry)) => Some(entry),
                // Vanished between listing and reading.
                Ok(None) => continue,
                Err(e @ Error::Malformed { .. }) => {
                    tracing::debug!(cache.path = %path.display(), error = %e, "cache.durable.malformed");
                    None
                }
                Err(e) => return Err(e),
            };

            if doomed(&path, entry.as_ref()) && Self::remove_file(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default()
}

impl CacheTier for DurableTier {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        Self::read_entry(&self.path_of(key)).await
    }

    async fn insert(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), Error> {
        let path = self.path_of(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Error::io(parent, e))?;
        }

        let bytes = entry.to_json_vec()?;
        let temp = temp_path(&path);
        fs::write(&temp, &bytes).await.map_err(|e| Error::io(&temp, e))?;

        if let Err(e) = fs::rename(&temp, &path).await {
            // Best effort: a leftover temp file is never read as an entry.
            let _ = fs::remove_file(&temp).await;
            return Err(Error::io(&path, e));
        }
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<bool, Error> {
        Self::remove_file(&self.path_of(key)).await
    }

    async fn clear(&self) -> Result<(), Error> {
        Self::remove_dir(&self.root).await?;
        self.ensure_root().await
    }

    async fn clear_namespace(&self, namespace: &str) -> Result<usize, Error> {
        let dir = self.root.join(namespace_dir(namespace));
        let count = Self::entry_files(&dir).await?.len();
        Self::remove_dir(&dir).await?;
        Ok(count)
    }

    async fn remove_matching(&self, pattern: &KeyPattern) -> Result<usize, Error> {
        self.remove_files_where(|path, entry| match entry {
            Some(entry) if !entry.key().is_empty() => pattern.matches(entry.key()),
            _ => pattern.matches(file_stem(path)),
        })
        .await
    }

    async fn purge_expired(&self, now: SystemTime) -> Result<usize, Error> {
        self.remove_files_where(|_, entry| entry.is_none_or(|entry| !entry.is_valid_at(now)))
            .await
    }

    async fn usage(&self) -> Result<TierUsage, Error> {
        let mut usage = TierUsage::default();
        for path in Self::entry_files(&self.root).await? {
            match fs::metadata(&path).await {
                Ok(metadata) => {
                    usage.entries += 1;
                    usage.bytes += metadata.len();
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(&path, e)),
            }
        }
        Ok(usage)
    }
}
