//! Upload capability consumed by the coordinator.

use media_cache_error::MediaCacheResult;
use media_cache_storage::{Asset, MediaKind};
use serde::{Deserialize, Serialize};

/// Where uploaded media is sent, e.g. the chat id of a private storage channel.
///
/// Opaque to the cache; only the uploader interprets it.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct UploadDestination(String);

impl UploadDestination {
    /// Wrap a destination identifier.
    pub fn new(destination: impl Into<String>) -> Self {
        Self(destination.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UploadDestination {
    fn from(destination: &str) -> Self {
        Self::new(destination)
    }
}

impl From<i64> for UploadDestination {
    fn from(chat_id: i64) -> Self {
        Self(chat_id.to_string())
    }
}

/// Transport capable of sending one asset to the remote platform.
///
/// This is the only network-performing call the cache makes. Implementations
/// pick a send method from `kind` (photo, video, document, ...) and return the
/// identifier the platform assigned to the accepted bytes.
///
/// Calling `upload` twice for the same asset must be harmless: the cache only
/// records an identifier after a successful return, so a repeat only costs
/// bandwidth.
///
/// # Errors
///
/// Any failure, including a transport-side timeout, should be reported as
/// [`media_cache_error::UploadError`].
#[async_trait::async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload `asset` to `destination` and return its remote identifier.
    async fn upload(
        &self,
        asset: &Asset,
        kind: MediaKind,
        destination: &UploadDestination,
    ) -> MediaCacheResult<String>;
}
