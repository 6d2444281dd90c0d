//! Upload limiter using governor and Tokio Semaphore.
//!
//! Two limits guard every network call:
//! - **Concurrent uploads**: enforced via Tokio Semaphore
//! - **Uploads per minute** (optional): enforced via governor (GCRA)

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use media_cache_error::{MediaCacheResult, UploadError, UploadErrorKind};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Bounds how many uploads run at once and how fast they start.
///
/// Cloning shares the same limits.
#[derive(Clone)]
pub struct UploadLimiter {
    per_minute: Option<Arc<DirectRateLimiter>>,
    concurrent: Arc<Semaphore>,
}

impl UploadLimiter {
    /// Create a limiter allowing `max_concurrent` simultaneous uploads and,
    /// if given, at most `uploads_per_minute` new uploads per minute.
    ///
    /// `max_concurrent` is clamped to at least 1; a rate of 0 means unlimited.
    pub fn new(max_concurrent: usize, uploads_per_minute: Option<u32>) -> Self {
        let per_minute = uploads_per_minute
            .and_then(NonZeroU32::new)
            .map(|n| Arc::new(GovernorRateLimiter::direct(Quota::per_minute(n))));

        Self {
            per_minute,
            concurrent: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Wait until an upload may start.
    ///
    /// Returns a guard that frees the concurrent slot when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`UploadErrorKind::Aborted`] if the limiter was shut down.
    pub async fn acquire(&self) -> MediaCacheResult<UploadPermit> {
        if let Some(limiter) = &self.per_minute {
            limiter.until_ready().await;
        }

        // Slot last, so a rate-limited upload does not hold one while waiting
        let permit = Arc::clone(&self.concurrent)
            .acquire_owned()
            .await
            .map_err(|e| UploadError::new(UploadErrorKind::Aborted(e.to_string())))?;

        Ok(UploadPermit { _permit: permit })
    }

    /// Number of uploads that could start right now.
    pub fn available(&self) -> usize {
        self.concurrent.available_permits()
    }
}

impl std::fmt::Debug for UploadLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadLimiter")
            .field("rate_limited", &self.per_minute.is_some())
            .field("available", &self.available())
            .finish()
    }
}

/// Concurrent-upload slot; released on drop.
#[derive(Debug)]
pub struct UploadPermit {
    _permit: OwnedSemaphorePermit,
}
