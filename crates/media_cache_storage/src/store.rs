//! Persistent cache store.
//!
//! The store exclusively owns a single JSON file mapping cache keys to
//! committed uploads:
//!
//! ```text
//! {
//!   "version": 1,
//!   "entries": {
//!     "a.jpg": {
//!       "remote_id": "AgACAgIAAxkDAAIB...",
//!       "fingerprint": "9f86d081884c7d65...",
//!       "media_kind": "photo",
//!       "uploaded_at": "2026-10-18T12:00:00Z"
//!     }
//!   }
//! }
//! ```
//!
//! Every mutation writes a complete snapshot to a hidden sibling temp file,
//! syncs it, and renames it over the backing file. The in-memory map changes
//! only after that rename succeeds, so a failed write is never visible.

use crate::{CacheEntry, CacheKey, Fingerprint, MediaKind};
use chrono::{DateTime, Utc};
use media_cache_error::{CacheError, CacheErrorKind, MediaCacheResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

const FORMAT_VERSION: u32 = 1;
const TEMP_SUFFIX: &str = ".tmp";

/// Whether `name` looks like a snapshot still being written (`.{name}.tmp`).
pub(crate) fn is_temp_file_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// On-disk representation of the whole cache.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, PersistedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    remote_id: String,
    fingerprint: Fingerprint,
    media_kind: MediaKind,
    uploaded_at: DateTime<Utc>,
}

/// Durable mapping from [`CacheKey`] to [`CacheEntry`].
///
/// Reads never block on a write in progress. Writers (`put`, `invalidate`,
/// `clear`) are serialised by an internal lock so concurrent commits on
/// different keys cannot interleave their file writes.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Load the store backed by `path`.
    ///
    /// A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::Corrupt`] if the file exists but cannot be
    /// read or parsed. Use [`CacheStore::open`] to recover from that instead.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> MediaCacheResult<Self> {
        let path = path.as_ref().to_path_buf();

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Cache file not found, starting with an empty cache");
                return Ok(Self::empty(path));
            }
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::Corrupt(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into());
            }
        };

        let entries = Self::parse(&path, &contents)?;
        tracing::info!(entries = entries.len(), "Cache loaded from file");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
        })
    }

    /// Load the store backed by `path`, treating a corrupt file as empty.
    ///
    /// The corrupt file is left in place and overwritten by the next
    /// successful mutation.
    ///
    /// # Errors
    ///
    /// Never fails for a corrupt or missing file; the `Result` is kept for
    /// symmetry with [`CacheStore::load`].
    pub async fn open(path: impl AsRef<Path>) -> MediaCacheResult<Self> {
        let path = path.as_ref();
        match Self::load(path).await {
            Ok(store) => Ok(store),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Discarding unreadable cache, starting empty"
                );
                Ok(Self::empty(path.to_path_buf()))
            }
        }
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            entries: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    fn parse(path: &Path, contents: &str) -> MediaCacheResult<HashMap<CacheKey, CacheEntry>> {
        let corrupt = |message: String| {
            CacheError::new(CacheErrorKind::Corrupt(format!(
                "{}: {}",
                path.display(),
                message
            )))
        };

        let file: CacheFile =
            serde_json::from_str(contents).map_err(|e| corrupt(e.to_string()))?;
        if file.version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported version {}", file.version)).into());
        }

        let mut entries = HashMap::with_capacity(file.entries.len());
        for (name, persisted) in file.entries {
            let key = CacheKey::from_relative(&name)
                .map_err(|e| corrupt(format!("bad key {:?}: {}", name, e)))?;
            let entry = CacheEntry::with_timestamp(
                key.clone(),
                persisted.remote_id,
                persisted.fingerprint,
                persisted.media_kind,
                persisted.uploaded_at,
            );
            entries.insert(key, entry);
        }
        Ok(entries)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the committed upload for `key`.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Snapshot of every entry, sorted by key.
    pub async fn entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<_> = self.entries.read().await.values().cloned().collect();
        entries.sort_by(|a, b| a.key().cmp(b.key()));
        entries
    }

    /// Number of committed entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Insert or replace the entry for its key and persist durably.
    ///
    /// Returns the entry that was replaced, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::PersistFailure`] if the snapshot cannot be
    /// written. The in-memory map is left untouched in that case.
    #[tracing::instrument(skip(self, entry), fields(key = %entry.key(), remote_id = %entry.remote_id()))]
    pub async fn put(&self, entry: CacheEntry) -> MediaCacheResult<Option<CacheEntry>> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.entries.read().await.clone();
        let previous = snapshot.insert(entry.key().clone(), entry);
        self.persist(&snapshot).await?;
        *self.entries.write().await = snapshot;

        tracing::debug!(replaced = previous.is_some(), "Committed cache entry");
        Ok(previous)
    }

    /// Remove the entry for `key` and persist durably.
    ///
    /// Returns the removed entry; removing an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::PersistFailure`] if the snapshot cannot be
    /// written. The in-memory map is left untouched in that case.
    #[tracing::instrument(skip(self, key), fields(key = %key))]
    pub async fn invalidate(&self, key: &CacheKey) -> MediaCacheResult<Option<CacheEntry>> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.entries.read().await.clone();
        let Some(removed) = snapshot.remove(key) else {
            return Ok(None);
        };
        self.persist(&snapshot).await?;
        *self.entries.write().await = snapshot;

        tracing::info!("Invalidated cache entry");
        Ok(Some(removed))
    }

    /// Drop every entry and delete the backing file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::PersistFailure`] if the file exists but
    /// cannot be removed.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn clear(&self) -> MediaCacheResult<usize> {
        let _guard = self.write_lock.lock().await;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::info!("Cache file removed from disk"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::new(CacheErrorKind::PersistFailure(format!(
                    "remove {}: {}",
                    self.path.display(),
                    e
                )))
                .into());
            }
        }

        let mut entries = self.entries.write().await;
        let cleared = entries.len();
        entries.clear();
        tracing::info!(cleared, "Cache in memory cleared");
        Ok(cleared)
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media_cache".to_string());
        self.path.with_file_name(format!(".{}{}", name, TEMP_SUFFIX))
    }

    /// Write `snapshot` to a temp file, sync it, then rename it into place.
    async fn persist(&self, snapshot: &HashMap<CacheKey, CacheEntry>) -> MediaCacheResult<()> {
        let file = CacheFile {
            version: FORMAT_VERSION,
            entries: snapshot
                .iter()
                .map(|(key, entry)| {
                    (
                        key.as_str().to_string(),
                        PersistedEntry {
                            remote_id: entry.remote_id().clone(),
                            fingerprint: entry.fingerprint().clone(),
                            media_kind: *entry.media_kind(),
                            uploaded_at: *entry.uploaded_at(),
                        },
                    )
                })
                .collect(),
        };

        let failure = |what: &str, path: &Path, e: &dyn std::fmt::Display| {
            CacheError::new(CacheErrorKind::PersistFailure(format!(
                "{} {}: {}",
                what,
                path.display(),
                e
            )))
        };

        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| failure("serialize", &self.path, &e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failure("create directory", parent, &e))?;
        }

        let temp_path = self.temp_path();
        let written = async {
            let mut temp = tokio::fs::File::create(&temp_path).await?;
            temp.write_all(&json).await?;
            temp.sync_all().await?;
            tokio::fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(failure("write", &self.path, &e).into());
        }

        tracing::debug!(
            path = %self.path.display(),
            entries = snapshot.len(),
            "Cache saved to file"
        );
        Ok(())
    }
}
