//! Top-level error wrapper types.

use crate::{AssetError, CacheError, ConfigError, UploadError};

/// Every failure the media cache can report.
///
/// # Examples
///
/// ```
/// use media_cache_error::{MediaCacheError, UploadError};
///
/// let err: MediaCacheError = UploadError::transport("connection reset").into();
/// assert!(format!("{}", err).contains("Upload Error"));
/// ```
#[derive(Debug, Clone, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum MediaCacheErrorKind {
    /// Local asset could not be read or addressed
    #[from(AssetError)]
    Asset(AssetError),
    /// Remote upload failed
    #[from(UploadError)]
    Upload(UploadError),
    /// Cache store could not be read or persisted
    #[from(CacheError)]
    Cache(CacheError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Media cache error with kind discrimination.
///
/// # Examples
///
/// ```
/// use media_cache_error::{ConfigError, MediaCacheResult};
///
/// fn might_fail() -> MediaCacheResult<()> {
///     Err(ConfigError::new("Missing upload_destination"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Media Cache Error: {}", _0)]
pub struct MediaCacheError(Box<MediaCacheErrorKind>);

impl MediaCacheError {
    /// Create a new error from a kind.
    pub fn new(kind: MediaCacheErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MediaCacheErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to MediaCacheErrorKind
impl<T> From<T> for MediaCacheError
where
    T: Into<MediaCacheErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for media cache operations.
pub type MediaCacheResult<T> = std::result::Result<T, MediaCacheError>;
