//! Upload orchestration for the media file_id cache.
//!
//! The [`UploadCoordinator`] answers one question per asset: "what is its
//! remote identifier?" It answers from the [`CacheStore`](media_cache_storage::CacheStore)
//! when the stored fingerprint still matches, and otherwise uploads through a
//! [`MediaUploader`] and commits the result. Concurrent requests for one key
//! share a single upload.
//!
//! # Example
//!
//! ```rust,no_run
//! use media_cache_storage::{Asset, CacheStore, MediaKind};
//! use media_cache_upload::{
//!     MediaUploader, UploadCoordinator, UploadDestination, UploadOptions,
//! };
//! use media_cache_error::MediaCacheResult;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl MediaUploader for Echo {
//!     async fn upload(
//!         &self,
//!         asset: &Asset,
//!         _kind: MediaKind,
//!         _destination: &UploadDestination,
//!     ) -> MediaCacheResult<String> {
//!         Ok(format!("remote-{}", asset.key()))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(CacheStore::open("media_cache.json").await?);
//! let coordinator = UploadCoordinator::new(
//!     "assets",
//!     UploadDestination::from(-100123456789_i64),
//!     store,
//!     Arc::new(Echo),
//!     UploadOptions::default(),
//! );
//!
//! let resolution = coordinator.ensure_uploaded("welcome.png").await?;
//! println!("file id: {}", resolution.remote_id());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod coordinator;
mod limiter;
mod uploader;

pub use coordinator::{
    DEFAULT_MAX_CONCURRENT_UPLOADS, Resolution, UploadCoordinator, UploadOptions,
};
pub use limiter::{UploadLimiter, UploadPermit};
pub use uploader::{MediaUploader, UploadDestination};
