//! Configuration for the media manager.
//!
//! Sources, in increasing precedence:
//! 1. Bundled defaults (`media_cache.toml` shipped with the crate)
//! 2. `~/.config/media_cache/media_cache.toml`
//! 3. `./media_cache.toml`
//! 4. `MEDIA_CACHE_*` environment variables

use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use media_cache_error::{ConfigError, MediaCacheError, MediaCacheResult};
use media_cache_upload::{DEFAULT_MAX_CONCURRENT_UPLOADS, UploadDestination, UploadOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Construction-time settings of a [`MediaManager`](crate::MediaManager).
///
/// # Example
///
/// ```toml
/// assets_root = "assets"
/// cache_path = "media_cache.json"
/// upload_destination = "-1001234567890"
/// max_concurrent_uploads = 4
/// uploads_per_minute = 20
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(setter(into))]
pub struct MediaCacheConfig {
    /// Directory containing the assets to upload
    assets_root: PathBuf,

    /// Path of the persisted cache file
    #[serde(default = "default_cache_path")]
    #[builder(default = "default_cache_path()")]
    cache_path: PathBuf,

    /// Where assets are uploaded (chat or channel id)
    #[serde(default)]
    #[builder(default)]
    upload_destination: UploadDestination,

    /// Maximum simultaneous uploads
    #[serde(default = "default_max_concurrent_uploads")]
    #[builder(default = "default_max_concurrent_uploads()")]
    max_concurrent_uploads: usize,

    /// Optional cap on uploads started per minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    #[setters(strip_option)]
    uploads_per_minute: Option<u32>,

    /// Optional deadline for one upload, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    #[setters(strip_option)]
    upload_timeout_secs: Option<u64>,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("media_cache.json")
}

fn default_max_concurrent_uploads() -> usize {
    DEFAULT_MAX_CONCURRENT_UPLOADS
}

impl MediaCacheConfig {
    /// Minimal configuration: everything but the two required paths defaulted.
    pub fn new(assets_root: impl Into<PathBuf>, upload_destination: impl Into<UploadDestination>) -> Self {
        Self {
            assets_root: assets_root.into(),
            cache_path: default_cache_path(),
            upload_destination: upload_destination.into(),
            max_concurrent_uploads: default_max_concurrent_uploads(),
            uploads_per_minute: None,
            upload_timeout_secs: None,
        }
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> MediaCacheResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                MediaCacheError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                MediaCacheError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and skipped if not found.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use media_cache::MediaCacheConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = MediaCacheConfig::load()?;
    /// println!("assets in {}", config.assets_root().display());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> MediaCacheResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../media_cache.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/media_cache/media_cache.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("media_cache").required(false))
            .add_source(Environment::with_prefix("MEDIA_CACHE").try_parsing(true));

        builder
            .build()
            .map_err(|e| {
                MediaCacheError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                MediaCacheError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Check the settings needed to upload.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero concurrency limit, rate or timeout,
    /// or an empty upload destination.
    pub fn validate(&self) -> MediaCacheResult<()> {
        if self.max_concurrent_uploads == 0 {
            return Err(ConfigError::new("max_concurrent_uploads must be at least 1").into());
        }
        if self.uploads_per_minute == Some(0) {
            return Err(ConfigError::new("uploads_per_minute must be at least 1 when set").into());
        }
        if self.upload_timeout_secs == Some(0) {
            return Err(ConfigError::new("upload_timeout_secs must be at least 1 when set").into());
        }
        if self.upload_destination.as_str().trim().is_empty() {
            return Err(ConfigError::new("upload_destination is required").into());
        }
        Ok(())
    }

    /// Coordinator tuning derived from these settings.
    pub fn upload_options(&self) -> UploadOptions {
        let mut options =
            UploadOptions::default().with_max_concurrent(self.max_concurrent_uploads);
        if let Some(rate) = self.uploads_per_minute {
            options = options.with_uploads_per_minute(rate);
        }
        if let Some(secs) = self.upload_timeout_secs {
            options = options.with_upload_timeout(Duration::from_secs(secs));
        }
        options
    }
}
