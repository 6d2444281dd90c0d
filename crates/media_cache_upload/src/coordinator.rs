//! Cache-coherent upload coordination.
//!
//! For each cache key the coordinator walks:
//!
//! ```text
//! UNCHECKED → CHECKING → CACHED
//!                      → UPLOADING → COMMITTED
//!                                  → FAILED (back to UNCHECKED)
//! ```
//!
//! Concurrent requests for one key collapse into a single attempt. The first
//! caller spawns the attempt on its own task and records a shared handle in
//! the in-flight table; later callers await that handle and get the same
//! outcome. The task drops its table entry when it ends, however it ends.

use crate::{MediaUploader, UploadDestination, UploadLimiter};
use derive_getters::Getters;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use media_cache_error::{MediaCacheResult, UploadError, UploadErrorKind};
use media_cache_storage::{Asset, AssetDescriptor, CacheEntry, CacheKey, CacheStore, resolve};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default number of simultaneous uploads.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 4;

type SharedAttempt = Shared<BoxFuture<'static, MediaCacheResult<Resolution>>>;

/// How a request for an asset was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The stored identifier was still valid; nothing was sent.
    Cached {
        /// Identifier from the cache
        remote_id: String,
    },
    /// The asset was uploaded and the new identifier committed.
    Uploaded {
        /// Identifier returned by the uploader
        remote_id: String,
        /// Identifier of the stale entry this upload replaced, if any
        replaced: Option<String>,
    },
}

impl Resolution {
    /// The identifier callers should use for this asset.
    pub fn remote_id(&self) -> &str {
        match self {
            Resolution::Cached { remote_id } | Resolution::Uploaded { remote_id, .. } => remote_id,
        }
    }

    /// Whether a network upload happened.
    pub fn was_uploaded(&self) -> bool {
        matches!(self, Resolution::Uploaded { .. })
    }
}

/// Tuning for the coordinator's network calls.
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct UploadOptions {
    /// Maximum simultaneous uploads
    max_concurrent: usize,
    /// Optional cap on uploads started per minute
    #[setters(strip_option)]
    uploads_per_minute: Option<u32>,
    /// Optional deadline for a single upload call
    #[setters(strip_option)]
    upload_timeout: Option<Duration>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT_UPLOADS,
            uploads_per_minute: None,
            upload_timeout: None,
        }
    }
}

/// Decides per asset whether to upload, uploads at most once per key at a
/// time, and commits the result to the [`CacheStore`].
///
/// Cheap to clone; clones share the in-flight table, limiter and store.
#[derive(Clone)]
pub struct UploadCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    assets_root: PathBuf,
    destination: UploadDestination,
    store: Arc<CacheStore>,
    uploader: Arc<dyn MediaUploader>,
    limiter: UploadLimiter,
    upload_timeout: Option<Duration>,
    in_flight: Mutex<HashMap<CacheKey, SharedAttempt>>,
}

impl UploadCoordinator {
    /// Create a coordinator for assets under `assets_root`.
    pub fn new(
        assets_root: impl Into<PathBuf>,
        destination: UploadDestination,
        store: Arc<CacheStore>,
        uploader: Arc<dyn MediaUploader>,
        options: UploadOptions,
    ) -> Self {
        let assets_root = assets_root.into();
        tracing::debug!(
            assets_root = %assets_root.display(),
            destination = %destination,
            max_concurrent = options.max_concurrent,
            uploads_per_minute = ?options.uploads_per_minute,
            "Creating UploadCoordinator"
        );

        Self {
            inner: Arc::new(Inner {
                assets_root,
                destination,
                store,
                uploader,
                limiter: UploadLimiter::new(options.max_concurrent, options.uploads_per_minute),
                upload_timeout: options.upload_timeout,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Root directory assets are resolved against.
    pub fn assets_root(&self) -> &Path {
        &self.inner.assets_root
    }

    /// The cache store results are committed to.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.inner.store
    }

    /// Number of keys with an upload attempt currently running.
    pub fn in_flight(&self) -> usize {
        self.table().len()
    }

    /// Make sure the asset at `path` (relative to, or under, the assets root)
    /// has a valid remote identifier, uploading it if needed.
    ///
    /// # Errors
    ///
    /// Returns the asset, upload or persistence error of the attempt. Every
    /// caller that joined the same attempt receives the same error, and the
    /// key is free for a fresh attempt afterwards.
    pub async fn ensure_uploaded(&self, path: impl AsRef<Path>) -> MediaCacheResult<Resolution> {
        let key = resolve(&self.inner.assets_root, path)?;
        self.ensure_key(key).await
    }

    /// Same as [`ensure_uploaded`](Self::ensure_uploaded) for an already resolved key.
    pub async fn ensure_key(&self, key: CacheKey) -> MediaCacheResult<Resolution> {
        let attempt = {
            let mut in_flight = self.table();
            match in_flight.get(&key) {
                Some(attempt) => {
                    tracing::debug!(key = %key, "Joining in-flight upload");
                    attempt.clone()
                }
                None => {
                    let attempt = self.spawn_attempt(key.clone());
                    in_flight.insert(key, attempt.clone());
                    attempt
                }
            }
        };

        attempt.await
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, SharedAttempt>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the attempt for `key` on its own task.
    ///
    /// Must be called with the in-flight table locked, so the task cannot
    /// release its entry before it has been inserted.
    fn spawn_attempt(&self, key: CacheKey) -> SharedAttempt {
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let _release = InFlightRelease {
                inner: &inner,
                key: &task_key,
            };
            inner.attempt(&task_key).await
        });

        handle
            .map(move |joined| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Upload attempt did not complete");
                    Err(UploadError::new(UploadErrorKind::Aborted(format!("{}: {}", key, e))).into())
                }
            })
            .boxed()
            .shared()
    }
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator")
            .field("assets_root", &self.inner.assets_root)
            .field("destination", &self.inner.destination)
            .field("limiter", &self.inner.limiter)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Removes a key from the in-flight table when its attempt ends, including
/// by panic or runtime shutdown.
struct InFlightRelease<'a> {
    inner: &'a Inner,
    key: &'a CacheKey,
}

impl Drop for InFlightRelease<'_> {
    fn drop(&mut self) {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.key);
    }
}

impl Inner {
    #[tracing::instrument(skip(self, key), fields(key = %key))]
    async fn attempt(&self, key: &CacheKey) -> MediaCacheResult<Resolution> {
        // CHECKING
        let descriptor = AssetDescriptor::new(&self.assets_root, key.clone());
        let asset = Asset::inspect(&descriptor).await?;

        match self.store.get(key).await {
            Some(entry) if entry.matches(asset.fingerprint()) => {
                tracing::debug!(remote_id = %entry.remote_id(), "Cache hit");
                return Ok(Resolution::Cached {
                    remote_id: entry.remote_id().clone(),
                });
            }
            Some(entry) => tracing::info!(
                cached = %entry.fingerprint(),
                current = %asset.fingerprint(),
                "Asset content changed, re-uploading"
            ),
            None => tracing::info!(media_kind = %asset.media_kind(), "Uploading asset"),
        }

        // UPLOADING
        let remote_id = self.upload(&asset).await.inspect_err(|e| {
            tracing::error!(error = %e, "Upload failed");
        })?;

        // COMMITTED only once the entry is durable
        let entry = CacheEntry::new(
            key.clone(),
            remote_id.clone(),
            asset.fingerprint().clone(),
            *asset.media_kind(),
        );
        let replaced = self.store.put(entry).await.inspect_err(|e| {
            tracing::error!(
                remote_id = %remote_id,
                error = %e,
                "Uploaded but could not record remote id"
            );
        })?;

        tracing::info!(remote_id = %remote_id, "Asset uploaded and cached");
        Ok(Resolution::Uploaded {
            remote_id,
            replaced: replaced.map(|previous| previous.remote_id().clone()),
        })
    }

    async fn upload(&self, asset: &Asset) -> MediaCacheResult<String> {
        let _permit = self.limiter.acquire().await?;

        let call = self
            .uploader
            .upload(asset, *asset.media_kind(), &self.destination);
        let remote_id = match self.upload_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                UploadError::new(UploadErrorKind::Timeout(format!(
                    "{} after {:?}",
                    asset.key(),
                    limit
                )))
            })??,
            None => call.await?,
        };

        if remote_id.is_empty() {
            return Err(UploadError::transport(format!(
                "{}: empty remote id in upload acknowledgement",
                asset.key()
            ))
            .into());
        }
        Ok(remote_id)
    }
}
