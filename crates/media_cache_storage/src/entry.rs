//! Cache entry type.

use crate::{CacheKey, Fingerprint, MediaKind};
use chrono::{DateTime, Utc};
use derive_getters::Getters;

/// A committed upload: the remote identifier an asset's bytes were accepted under.
///
/// Only ever built from a successful upload acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct CacheEntry {
    key: CacheKey,
    remote_id: String,
    fingerprint: Fingerprint,
    media_kind: MediaKind,
    uploaded_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Record an upload that completed now.
    pub fn new(
        key: CacheKey,
        remote_id: impl Into<String>,
        fingerprint: Fingerprint,
        media_kind: MediaKind,
    ) -> Self {
        Self::with_timestamp(key, remote_id, fingerprint, media_kind, Utc::now())
    }

    /// Record an upload with an explicit timestamp (used when loading from disk).
    pub fn with_timestamp(
        key: CacheKey,
        remote_id: impl Into<String>,
        fingerprint: Fingerprint,
        media_kind: MediaKind,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            remote_id: remote_id.into(),
            fingerprint,
            media_kind,
            uploaded_at,
        }
    }

    /// Whether this entry still describes an asset with the given content.
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        &self.fingerprint == fingerprint
    }
}
