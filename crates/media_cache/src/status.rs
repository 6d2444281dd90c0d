//! Network-free view of which assets still need uploading.

use derive_getters::Getters;
use media_cache_error::MediaCacheResult;
use media_cache_storage::{Asset, CacheKey, CacheStore, scan_assets};
use std::path::Path;

/// Cache state of one asset on disk.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum AssetState {
    /// Stored identifier matches the current content
    #[display("cached ({})", remote_id)]
    Cached {
        /// Identifier that will be reused
        remote_id: String,
    },
    /// Stored identifier belongs to older content
    #[display("stale ({})", remote_id)]
    Stale {
        /// Identifier that will be replaced
        remote_id: String,
    },
    /// Never uploaded
    #[display("new")]
    New,
    /// File could not be read
    #[display("unreadable: {}", reason)]
    Unreadable {
        /// Why reading failed
        reason: String,
    },
}

/// One row of [`asset_status`].
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct AssetStatus {
    key: CacheKey,
    state: AssetState,
}

/// Compare every asset under `root` with `store` without uploading anything.
///
/// # Errors
///
/// Returns an error if `root` cannot be scanned. Unreadable files are
/// reported per asset instead.
#[tracing::instrument(skip(root, store), fields(root = %root.as_ref().display()))]
pub async fn asset_status(
    root: impl AsRef<Path>,
    store: &CacheStore,
) -> MediaCacheResult<Vec<AssetStatus>> {
    let descriptors = scan_assets(root).await?;
    let mut statuses = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let state = match Asset::inspect(&descriptor).await {
            Err(e) => AssetState::Unreadable {
                reason: e.to_string(),
            },
            Ok(asset) => match store.get(asset.key()).await {
                Some(entry) if entry.matches(asset.fingerprint()) => AssetState::Cached {
                    remote_id: entry.remote_id().clone(),
                },
                Some(entry) => AssetState::Stale {
                    remote_id: entry.remote_id().clone(),
                },
                None => AssetState::New,
            },
        };
        statuses.push(AssetStatus {
            key: descriptor.key().clone(),
            state,
        });
    }

    Ok(statuses)
}
