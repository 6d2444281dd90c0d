//! Asset identity: cache keys and content fingerprints.
//!
//! A [`CacheKey`] is the logical name of an asset (its path relative to the
//! assets root). A [`Fingerprint`] is the SHA-256 of its bytes and only tells
//! whether a cached upload is still valid for that name.

use media_cache_error::{AssetError, AssetErrorKind, MediaCacheResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Component, Path};
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 64 * 1024;

/// Stable cache key derived from an asset's path relative to the assets root.
///
/// Separators are normalised to `/` and `.` components are dropped, so the
/// same relative path always yields the same key on every platform.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from a path that is already relative to the assets root.
    ///
    /// # Errors
    ///
    /// Returns [`AssetErrorKind::InvalidPath`] for empty or absolute paths,
    /// paths with `..` components, or non UTF-8 names.
    ///
    /// ```
    /// use media_cache_storage::CacheKey;
    ///
    /// let key = CacheKey::from_relative("./stickers/hello.png").unwrap();
    /// assert_eq!(key.as_str(), "stickers/hello.png");
    /// assert!(CacheKey::from_relative("../secret.png").is_err());
    /// ```
    pub fn from_relative(path: impl AsRef<Path>) -> MediaCacheResult<Self> {
        let path = path.as_ref();
        let invalid = |reason: &str| {
            AssetError::new(AssetErrorKind::InvalidPath(format!(
                "{}: {}",
                path.display(),
                reason
            )))
        };

        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| invalid("not valid UTF-8"))?;
                    parts.push(part);
                }
                Component::ParentDir => return Err(invalid("escapes the assets root").into()),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("must be relative to the assets root").into());
                }
            }
        }

        if parts.is_empty() {
            return Err(invalid("empty asset name").into());
        }

        Ok(Self(parts.join("/")))
    }

    /// The key as stored in the cache file.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolve the cache key of `path`, which may be absolute (under `root`) or
/// relative to `root`.
///
/// Pure function of the two paths; the working directory plays no part.
///
/// # Errors
///
/// Returns [`AssetErrorKind::InvalidPath`] when an absolute `path` lies
/// outside `root`.
pub fn resolve(root: impl AsRef<Path>, path: impl AsRef<Path>) -> MediaCacheResult<CacheKey> {
    let root = root.as_ref();
    let path = path.as_ref();

    if path.is_absolute() {
        let relative = path.strip_prefix(root).map_err(|_| {
            AssetError::new(AssetErrorKind::InvalidPath(format!(
                "{} is outside {}",
                path.display(),
                root.display()
            )))
        })?;
        CacheKey::from_relative(relative)
    } else {
        CacheKey::from_relative(path)
    }
}

/// Lowercase hex SHA-256 of an asset's bytes.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compute the content fingerprint of the file at `path`.
///
/// The file is streamed in fixed-size chunks, so large videos are never held
/// in memory whole.
///
/// # Errors
///
/// Returns [`AssetErrorKind::Unreadable`] if the file cannot be opened or read.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub async fn fingerprint(path: impl AsRef<Path>) -> MediaCacheResult<Fingerprint> {
    let path = path.as_ref();
    let unreadable = |e: std::io::Error| {
        AssetError::new(AssetErrorKind::Unreadable(format!("{}: {}", path.display(), e)))
    };

    let mut file = tokio::fs::File::open(path).await.map_err(unreadable)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK];

    loop {
        let read = file.read(&mut buffer).await.map_err(unreadable)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let fingerprint = Fingerprint(format!("{:x}", hasher.finalize()));
    tracing::trace!(fingerprint = %fingerprint, "Fingerprinted asset");
    Ok(fingerprint)
}
