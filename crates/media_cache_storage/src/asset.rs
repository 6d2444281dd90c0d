//! Local media assets and the default directory scanner.

use crate::store::is_temp_file_name;
use crate::{CacheKey, Fingerprint, MediaKind, fingerprint};
use derive_getters::Getters;
use media_cache_error::{AssetError, AssetErrorKind, MediaCacheResult};
use std::path::{Path, PathBuf};

/// A file discovered under the assets root, before it has been hashed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct AssetDescriptor {
    key: CacheKey,
    path: PathBuf,
}

impl AssetDescriptor {
    /// Describe the asset named `key` under `root`.
    pub fn new(root: impl AsRef<Path>, key: CacheKey) -> Self {
        let path = root.as_ref().join(key.as_str());
        Self { key, path }
    }
}

/// A hashed, classified asset ready for the upload decision.
///
/// Immutable for the duration of one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
pub struct Asset {
    key: CacheKey,
    path: PathBuf,
    fingerprint: Fingerprint,
    media_kind: MediaKind,
}

impl Asset {
    /// Read the asset behind `descriptor`: fingerprint its bytes and detect its kind.
    ///
    /// # Errors
    ///
    /// Returns [`AssetErrorKind::Unreadable`] if the file cannot be read.
    pub async fn inspect(descriptor: &AssetDescriptor) -> MediaCacheResult<Self> {
        let fingerprint = fingerprint(&descriptor.path).await?;
        Ok(Self {
            key: descriptor.key.clone(),
            path: descriptor.path.clone(),
            fingerprint,
            media_kind: MediaKind::detect(&descriptor.path),
        })
    }
}

/// Enumerate every regular file under `root`, recursively.
///
/// Symlinks to files are followed and keyed by the link's own name. Hidden
/// directories (leading `.`), symlinked directories and in-progress cache
/// snapshots (`.*.tmp`) are skipped; hidden files are assets like any other.
/// The result is sorted by key, so repeated scans of an unchanged tree are
/// identical.
///
/// # Errors
///
/// Returns [`AssetErrorKind::RootNotFound`] if `root` is missing or not a
/// directory, and [`AssetErrorKind::Unreadable`] if a directory cannot be
/// listed.
#[tracing::instrument(skip(root), fields(root = %root.as_ref().display()))]
pub async fn scan_assets(root: impl AsRef<Path>) -> MediaCacheResult<Vec<AssetDescriptor>> {
    let root = root.as_ref();

    let is_dir = tokio::fs::metadata(root)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        tracing::error!("Assets root does not exist or is not a directory");
        return Err(AssetError::new(AssetErrorKind::RootNotFound(
            root.display().to_string(),
        ))
        .into());
    }

    let mut assets = Vec::new();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative_dir) = pending.pop() {
        let dir = root.join(&relative_dir);
        let unreadable = |e: std::io::Error| {
            AssetError::new(AssetErrorKind::Unreadable(format!("{}: {}", dir.display(), e)))
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(unreadable)?;
        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            let relative = relative_dir.join(&name);
            let file_type = entry.file_type().await.map_err(unreadable)?;

            // Linked files count as assets; linked directories are not followed
            let is_file = if file_type.is_symlink() {
                match tokio::fs::metadata(entry.path()).await {
                    Ok(target) if target.is_file() => true,
                    Ok(_) => {
                        tracing::warn!(path = %relative.display(), "Skipping symlink that is not a regular file");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(path = %relative.display(), error = %e, "Skipping dangling symlink");
                        continue;
                    }
                }
            } else {
                file_type.is_file()
            };

            if file_type.is_dir() {
                if name_str.starts_with('.') {
                    tracing::debug!(path = %relative.display(), "Skipping hidden directory");
                } else {
                    pending.push(relative);
                }
            } else if is_file {
                if is_temp_file_name(&name_str) {
                    continue;
                }
                match CacheKey::from_relative(&relative) {
                    Ok(key) => assets.push(AssetDescriptor::new(root, key)),
                    Err(e) => tracing::warn!(path = %relative.display(), error = %e, "Skipping asset"),
                }
            }
        }
    }

    assets.sort();
    tracing::debug!(count = assets.len(), "Scanned assets");
    Ok(assets)
}
