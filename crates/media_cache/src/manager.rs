//! Media manager facade.

use crate::{AssetOutcome, AssetStatus, BatchReport, MediaCacheConfig, asset_status};
use futures::stream::{self, StreamExt};
use media_cache_error::MediaCacheResult;
use media_cache_storage::{CacheStore, resolve, scan_assets};
use media_cache_upload::{MediaUploader, Resolution, UploadCoordinator};
use std::path::Path;
use std::sync::Arc;

/// Uploads a directory of media once and hands out the remote identifiers.
///
/// # Example
///
/// ```rust,no_run
/// use media_cache::{MediaCacheConfig, MediaManager};
/// # use media_cache_upload::MediaUploader;
/// # use std::sync::Arc;
///
/// # async fn example(bot: Arc<dyn MediaUploader>) -> Result<(), Box<dyn std::error::Error>> {
/// let config = MediaCacheConfig::new("assets", -1001234567890_i64);
/// let manager = MediaManager::new(config, bot).await?;
///
/// let report = manager.upload_assets().await?;
/// println!("{} uploaded, {} cached, {} failed", report.uploaded(), report.cached(), report.failed());
///
/// if let Some(file_id) = manager.get_file_id("welcome.png").await {
///     println!("send photo {file_id}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MediaManager {
    config: MediaCacheConfig,
    coordinator: UploadCoordinator,
}

impl MediaManager {
    /// Validate `config`, load the cache and prepare the coordinator.
    ///
    /// A corrupt cache file is discarded with a warning rather than failing.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is not usable for uploads.
    #[tracing::instrument(skip_all, fields(assets_root = %config.assets_root().display(), cache_path = %config.cache_path().display()))]
    pub async fn new(
        config: MediaCacheConfig,
        uploader: Arc<dyn MediaUploader>,
    ) -> MediaCacheResult<Self> {
        config.validate()?;
        let store = Arc::new(CacheStore::open(config.cache_path()).await?);
        Ok(Self::with_store(config, store, uploader))
    }

    /// Build a manager around an already opened store.
    pub fn with_store(
        config: MediaCacheConfig,
        store: Arc<CacheStore>,
        uploader: Arc<dyn MediaUploader>,
    ) -> Self {
        let coordinator = UploadCoordinator::new(
            config.assets_root().clone(),
            config.upload_destination().clone(),
            store,
            uploader,
            config.upload_options(),
        );
        Self {
            config,
            coordinator,
        }
    }

    /// Settings this manager was built with.
    pub fn config(&self) -> &MediaCacheConfig {
        &self.config
    }

    /// The underlying cache store.
    pub fn store(&self) -> &Arc<CacheStore> {
        self.coordinator.store()
    }

    /// Upload every asset under the assets root that is new or changed.
    ///
    /// Assets are processed with at most `max_concurrent_uploads` in flight.
    /// Each asset succeeds or fails on its own; see [`BatchReport`].
    ///
    /// Every file under the root is an asset, hidden files and symlinked files
    /// included. Hidden directories and the cache's own `.*.tmp` snapshots
    /// are not; see [`scan_assets`].
    ///
    /// # Errors
    ///
    /// Fails as a whole only if the assets root cannot be scanned.
    #[tracing::instrument(skip(self), fields(assets_root = %self.config.assets_root().display()))]
    pub async fn upload_assets(&self) -> MediaCacheResult<BatchReport> {
        let assets = scan_assets(self.config.assets_root()).await?;
        let concurrency = (*self.config.max_concurrent_uploads()).max(1);
        tracing::info!(assets = assets.len(), concurrency, "Starting asset upload pass");

        let outcomes: Vec<AssetOutcome> = stream::iter(assets)
            .map(|descriptor| {
                let coordinator = self.coordinator.clone();
                async move {
                    let key = descriptor.key().clone();
                    let result = coordinator.ensure_key(key.clone()).await;
                    AssetOutcome::new(key, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let report = BatchReport::new(outcomes);
        for (key, error) in report.failures() {
            tracing::error!(key = %key, error = %error, "Error while uploading asset");
        }
        tracing::info!(
            uploaded = report.uploaded(),
            cached = report.cached(),
            failed = report.failed(),
            "Asset upload pass finished"
        );
        Ok(report)
    }

    /// Upload one asset by name if it is new or changed.
    ///
    /// # Errors
    ///
    /// Returns the asset, upload or persistence error of the attempt.
    pub async fn upload_asset(&self, name: impl AsRef<Path>) -> MediaCacheResult<Resolution> {
        self.coordinator.ensure_uploaded(name).await
    }

    /// Remote identifier recorded for `name`, if it was ever uploaded.
    ///
    /// Never fails: unknown and invalid names are simply not cached.
    pub async fn get_file_id(&self, name: impl AsRef<Path>) -> Option<String> {
        let name = name.as_ref();
        let key = match resolve(self.config.assets_root(), name) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(name = %name.display(), error = %e, "Not a valid asset name");
                return None;
            }
        };

        match self.store().get(&key).await {
            Some(entry) => {
                tracing::debug!(key = %key, "file_id found in cache");
                Some(entry.remote_id().clone())
            }
            None => {
                tracing::warn!(key = %key, "file_id not found in cache");
                None
            }
        }
    }

    /// Compare the assets on disk with the cache without uploading.
    ///
    /// # Errors
    ///
    /// Returns an error if the assets root cannot be scanned.
    pub async fn status(&self) -> MediaCacheResult<Vec<AssetStatus>> {
        asset_status(self.config.assets_root(), self.store()).await
    }

    /// Forget every remote identifier, in memory and on disk.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the cache file cannot be removed.
    pub async fn clear_cache(&self) -> MediaCacheResult<usize> {
        self.store().clear().await
    }
}
