//! Upload media assets to a messaging platform once and reuse their file ids.
//!
//! Bots that send the same pictures and clips over and over should upload
//! each file a single time and afterwards send the identifier the platform
//! assigned to it. [`MediaManager`] does that for a directory of assets:
//!
//! - [`MediaManager::upload_assets`] uploads every new or changed file
//! - [`MediaManager::get_file_id`] returns the identifier to send
//!
//! Identifiers are persisted in a JSON cache file, so later runs skip files
//! whose content has not changed. The actual transport is any
//! [`MediaUploader`] implementation.
//!
//! # Crates
//!
//! - [`media_cache_storage`]: identity, media kinds, scanning, cache store
//! - [`media_cache_upload`]: uploader trait and single-flight coordinator
//! - [`media_cache_error`]: error types

#![warn(missing_docs)]

mod config;
mod manager;
mod observability;
mod report;
mod status;

pub use config::{MediaCacheConfig, MediaCacheConfigBuilder, MediaCacheConfigBuilderError};
pub use manager::MediaManager;
pub use observability::{TracingConfig, init_tracing};
pub use report::{AssetOutcome, BatchReport};
pub use status::{AssetState, AssetStatus, asset_status};

pub use media_cache_error::{MediaCacheError, MediaCacheErrorKind, MediaCacheResult};
pub use media_cache_storage::{CacheEntry, CacheKey, CacheStore, MediaKind};
pub use media_cache_upload::{MediaUploader, Resolution, UploadDestination};
