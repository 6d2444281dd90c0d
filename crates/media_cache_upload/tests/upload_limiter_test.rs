//! Tests for the upload rate and concurrency limits.

use media_cache_error::MediaCacheResult;
use media_cache_storage::{Asset, CacheStore, MediaKind};
use media_cache_upload::{
    MediaUploader, UploadCoordinator, UploadDestination, UploadLimiter, UploadOptions,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

// Governor runs on the wall clock, so these waits are real time.
const HELD_BACK: Duration = Duration::from_millis(300);

#[tokio::test]
async fn test_per_minute_cap_holds_back_second_permit() {
    let limiter = UploadLimiter::new(4, Some(1));

    let first = tokio::time::timeout(HELD_BACK, limiter.acquire()).await;
    assert!(first.is_ok(), "first upload starts immediately");

    let second = tokio::time::timeout(HELD_BACK, limiter.acquire()).await;
    assert!(second.is_err(), "second upload must wait for the next minute");
}

#[tokio::test]
async fn test_zero_rate_means_unlimited() {
    for rate in [None, Some(0)] {
        let limiter = UploadLimiter::new(8, rate);
        let mut permits = Vec::new();
        for _ in 0..5 {
            let permit = tokio::time::timeout(HELD_BACK, limiter.acquire())
                .await
                .expect("no rate limit configured")
                .unwrap();
            permits.push(permit);
        }
        assert_eq!(limiter.available(), 3);
    }
}

#[tokio::test]
async fn test_permit_frees_concurrent_slot_on_drop() {
    let limiter = UploadLimiter::new(0, None);
    assert_eq!(limiter.available(), 1);

    let permit = limiter.acquire().await.unwrap();
    assert_eq!(limiter.available(), 0);
    assert!(
        tokio::time::timeout(HELD_BACK, limiter.acquire())
            .await
            .is_err()
    );

    drop(permit);
    assert_eq!(limiter.available(), 1);
}

#[derive(Default)]
struct CountingUploader {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl MediaUploader for CountingUploader {
    async fn upload(
        &self,
        asset: &Asset,
        _kind: MediaKind,
        _destination: &UploadDestination,
    ) -> MediaCacheResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("id-{}", asset.key()))
    }
}

#[tokio::test]
async fn test_coordinator_applies_uploads_per_minute() {
    let temp_dir = TempDir::new().unwrap();
    let assets = temp_dir.path().join("assets");
    tokio::fs::create_dir_all(&assets).await.unwrap();
    tokio::fs::write(assets.join("a.jpg"), b"a").await.unwrap();
    tokio::fs::write(assets.join("b.jpg"), b"b").await.unwrap();

    let uploader = Arc::new(CountingUploader::default());
    let store = Arc::new(CacheStore::open(temp_dir.path().join("cache.json")).await.unwrap());
    let coordinator = UploadCoordinator::new(
        &assets,
        UploadDestination::new("@storage"),
        store,
        Arc::clone(&uploader) as Arc<dyn MediaUploader>,
        UploadOptions::default().with_uploads_per_minute(1),
    );

    let first = coordinator.ensure_uploaded("a.jpg").await.unwrap();
    assert_eq!(first.remote_id(), "id-a.jpg");

    let second = tokio::time::timeout(HELD_BACK, coordinator.ensure_uploaded("b.jpg")).await;
    assert!(second.is_err());
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.in_flight(), 1);

    // Cached assets never wait on the rate limit
    let again = tokio::time::timeout(HELD_BACK, coordinator.ensure_uploaded("a.jpg"))
        .await
        .unwrap()
        .unwrap();
    assert!(!again.was_uploaded());
}

#[tokio::test]
async fn test_coordinator_without_rate_uploads_back_to_back() {
    let temp_dir = TempDir::new().unwrap();
    let assets = temp_dir.path().join("assets");
    tokio::fs::create_dir_all(&assets).await.unwrap();
    for i in 0..3 {
        tokio::fs::write(assets.join(format!("{i}.png")), format!("img {i}"))
            .await
            .unwrap();
    }

    let uploader = Arc::new(CountingUploader::default());
    let store = Arc::new(CacheStore::open(temp_dir.path().join("cache.json")).await.unwrap());
    let coordinator = UploadCoordinator::new(
        &assets,
        UploadDestination::new("@storage"),
        store,
        Arc::clone(&uploader) as Arc<dyn MediaUploader>,
        UploadOptions::default().with_uploads_per_minute(0),
    );

    for i in 0..3 {
        tokio::time::timeout(HELD_BACK, coordinator.ensure_uploaded(format!("{i}.png")))
            .await
            .unwrap()
            .unwrap();
    }
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 3);
}
