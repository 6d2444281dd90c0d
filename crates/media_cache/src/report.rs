//! Per-asset outcomes of an upload pass.

use derive_getters::Getters;
use media_cache_error::{MediaCacheError, MediaCacheResult};
use media_cache_storage::CacheKey;
use media_cache_upload::Resolution;

/// What happened to one asset during [`upload_assets`](crate::MediaManager::upload_assets).
#[derive(Debug, Clone, Getters)]
pub struct AssetOutcome {
    key: CacheKey,
    result: MediaCacheResult<Resolution>,
}

impl AssetOutcome {
    /// Pair an asset with its result.
    pub fn new(key: CacheKey, result: MediaCacheResult<Resolution>) -> Self {
        Self { key, result }
    }

    /// Remote identifier, if the asset ended up cached.
    pub fn remote_id(&self) -> Option<&str> {
        self.result.as_ref().ok().map(Resolution::remote_id)
    }

    /// The failure, if the asset could not be uploaded or recorded.
    pub fn error(&self) -> Option<&MediaCacheError> {
        self.result.as_ref().err()
    }
}

/// Report of a whole upload pass, one outcome per asset sorted by key.
///
/// A failed asset never hides the outcome of its siblings.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    outcomes: Vec<AssetOutcome>,
}

impl BatchReport {
    /// Build a report; outcomes are sorted by key.
    pub fn new(mut outcomes: Vec<AssetOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.key.cmp(&b.key));
        Self { outcomes }
    }

    /// Every outcome, sorted by key.
    pub fn outcomes(&self) -> &[AssetOutcome] {
        &self.outcomes
    }

    /// Outcome for one asset.
    pub fn get(&self, key: &CacheKey) -> Option<&AssetOutcome> {
        self.outcomes
            .binary_search_by(|outcome| outcome.key.cmp(key))
            .ok()
            .map(|index| &self.outcomes[index])
    }

    /// Assets that were sent over the network in this pass.
    pub fn uploaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(r) if r.was_uploaded()))
            .count()
    }

    /// Assets whose stored identifier was reused.
    pub fn cached(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(r) if !r.was_uploaded()))
            .count()
    }

    /// Assets that failed.
    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    /// Failed assets with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&CacheKey, &MediaCacheError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error().map(|e| (&o.key, e)))
    }

    /// Whether every asset now has a remote identifier.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}
