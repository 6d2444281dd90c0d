//! Tests for single-flight upload coordination.

use media_cache_error::{
    CacheErrorKind, MediaCacheError, MediaCacheErrorKind, MediaCacheResult, UploadError,
    UploadErrorKind,
};
use media_cache_storage::{Asset, CacheKey, CacheStore, MediaKind};
use media_cache_upload::{
    MediaUploader, Resolution, UploadCoordinator, UploadDestination, UploadOptions,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Uploader that records every call and can be scripted to misbehave.
#[derive(Default)]
struct FakeUploader {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
    reply: Option<String>,
    panics: bool,
    seen: Mutex<Vec<(String, MediaKind, String)>>,
}

impl FakeUploader {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaUploader for FakeUploader {
    async fn upload(
        &self,
        asset: &Asset,
        kind: MediaKind,
        destination: &UploadDestination,
    ) -> MediaCacheResult<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().unwrap().push((
            asset.key().to_string(),
            kind,
            destination.to_string(),
        ));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("transport exploded");
        }
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
        {
            return Err(UploadError::transport("503 Service Unavailable").into());
        }

        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| format!("REMOTE{}-{}", n, asset.key())))
    }
}

struct Fixture {
    temp_dir: TempDir,
    coordinator: UploadCoordinator,
}

impl Fixture {
    async fn new(uploader: Arc<FakeUploader>, options: UploadOptions) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let cache_path = temp_dir.path().join("cache.json");
        Self::with_cache_path(temp_dir, &cache_path, uploader, options).await
    }

    async fn with_cache_path(
        temp_dir: TempDir,
        cache_path: &Path,
        uploader: Arc<FakeUploader>,
        options: UploadOptions,
    ) -> Self {
        let assets = temp_dir.path().join("assets");
        tokio::fs::create_dir_all(&assets).await.unwrap();
        let store = Arc::new(CacheStore::open(cache_path).await.unwrap());
        let coordinator = UploadCoordinator::new(
            assets,
            UploadDestination::from(-1001234_i64),
            store,
            uploader,
            options,
        );
        Self {
            temp_dir,
            coordinator,
        }
    }

    async fn write(&self, name: &str, data: &[u8]) {
        let path = self.temp_dir.path().join("assets").join(name);
        tokio::fs::write(path, data).await.unwrap();
    }
}

fn upload_error_kind(err: &MediaCacheError) -> UploadErrorKind {
    match err.kind() {
        MediaCacheErrorKind::Upload(e) => e.kind.clone(),
        other => panic!("expected upload error, got {other}"),
    }
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let uploader = Arc::new(FakeUploader::default());
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;
    fixture.write("a.jpg", b"B1").await;

    let first = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap();
    assert!(first.was_uploaded());

    let second = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap();
    assert_eq!(
        second,
        Resolution::Cached {
            remote_id: first.remote_id().to_string()
        }
    );
    assert_eq!(uploader.calls(), 1);

    let seen = uploader.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![("a.jpg".to_string(), MediaKind::Photo, "-1001234".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_upload() {
    let uploader = Arc::new(FakeUploader::with_delay(Duration::from_millis(100)));
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;
    fixture.write("intro.mp4", b"video bytes").await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let coordinator = fixture.coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator.ensure_uploaded("intro.mp4").await
        }));
    }

    let mut remote_ids = Vec::new();
    for handle in handles {
        remote_ids.push(handle.await.unwrap().unwrap().remote_id().to_string());
    }

    assert_eq!(uploader.calls(), 1);
    assert!(remote_ids.iter().all(|id| id == &remote_ids[0]));
    assert_eq!(fixture.coordinator.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failure_is_shared_and_key_released() {
    let uploader = Arc::new(FakeUploader {
        delay: Duration::from_millis(100),
        failures_left: AtomicUsize::new(1),
        ..FakeUploader::default()
    });
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;
    fixture.write("a.jpg", b"B1").await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let coordinator = fixture.coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator.ensure_uploaded("a.jpg").await
        }));
    }
    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(upload_error_kind(&err), UploadErrorKind::Transport(_)));
    }

    assert_eq!(uploader.calls(), 1);
    assert_eq!(fixture.coordinator.in_flight(), 0);
    let key = CacheKey::from_relative("a.jpg").unwrap();
    assert!(fixture.coordinator.store().get(&key).await.is_none());

    // A later attempt starts fresh
    let retry = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap();
    assert!(retry.was_uploaded());
    assert_eq!(uploader.calls(), 2);
}

#[tokio::test]
async fn test_changed_content_triggers_reupload() {
    let uploader = Arc::new(FakeUploader::default());
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;

    fixture.write("a.jpg", b"B1").await;
    let first = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap();

    fixture.write("a.jpg", b"B2").await;
    let second = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap();

    assert_eq!(uploader.calls(), 2);
    match &second {
        Resolution::Uploaded { replaced, .. } => {
            assert_eq!(replaced.as_deref(), Some(first.remote_id()));
        }
        other => panic!("expected upload, got {other:?}"),
    }

    let key = CacheKey::from_relative("a.jpg").unwrap();
    let entry = fixture.coordinator.store().get(&key).await.unwrap();
    assert_eq!(entry.remote_id(), second.remote_id());
    assert_eq!(fixture.coordinator.store().len().await, 1);
}

#[tokio::test]
async fn test_identical_content_under_two_names_uploads_twice() {
    let uploader = Arc::new(FakeUploader::default());
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;
    fixture.write("a.png", b"same").await;
    fixture.write("b.png", b"same").await;

    let a = fixture.coordinator.ensure_uploaded("a.png").await.unwrap();
    let b = fixture.coordinator.ensure_uploaded("b.png").await.unwrap();

    assert_eq!(uploader.calls(), 2);
    assert_ne!(a.remote_id(), b.remote_id());
}

#[tokio::test]
async fn test_persist_failure_reports_error_and_is_retried() {
    let uploader = Arc::new(FakeUploader::default());
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    tokio::fs::write(&blocker, b"not a directory").await.unwrap();
    let cache_path = blocker.join("cache.json");
    let fixture = Fixture::with_cache_path(
        temp_dir,
        &cache_path,
        Arc::clone(&uploader),
        UploadOptions::default(),
    )
    .await;
    fixture.write("a.jpg", b"B1").await;

    let err = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap_err();
    assert!(matches!(
        err.kind(),
        MediaCacheErrorKind::Cache(e) if matches!(e.kind, CacheErrorKind::PersistFailure(_))
    ));
    assert!(fixture.coordinator.store().is_empty().await);
    assert_eq!(fixture.coordinator.in_flight(), 0);

    // Not treated as cached: the next attempt uploads again
    let _ = fixture.coordinator.ensure_uploaded("a.jpg").await;
    assert_eq!(uploader.calls(), 2);
}

#[tokio::test]
async fn test_timeout_is_an_upload_failure() {
    let uploader = Arc::new(FakeUploader::with_delay(Duration::from_secs(5)));
    let options = UploadOptions::default().with_upload_timeout(Duration::from_millis(50));
    let fixture = Fixture::new(Arc::clone(&uploader), options).await;
    fixture.write("slow.mp4", b"slow").await;

    let err = fixture.coordinator.ensure_uploaded("slow.mp4").await.unwrap_err();
    assert!(matches!(upload_error_kind(&err), UploadErrorKind::Timeout(_)));
    assert_eq!(fixture.coordinator.in_flight(), 0);
    assert!(fixture.coordinator.store().is_empty().await);
}

#[tokio::test]
async fn test_empty_remote_id_is_not_cached() {
    let uploader = Arc::new(FakeUploader {
        reply: Some(String::new()),
        ..FakeUploader::default()
    });
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;
    fixture.write("a.jpg", b"B1").await;

    let err = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap_err();
    assert!(matches!(upload_error_kind(&err), UploadErrorKind::Transport(_)));
    assert!(fixture.coordinator.store().is_empty().await);
}

#[tokio::test]
async fn test_panicking_uploader_releases_key() {
    let uploader = Arc::new(FakeUploader {
        panics: true,
        ..FakeUploader::default()
    });
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;
    fixture.write("a.jpg", b"B1").await;

    let err = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap_err();
    assert!(matches!(upload_error_kind(&err), UploadErrorKind::Aborted(_)));
    assert_eq!(fixture.coordinator.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_caller_does_not_strand_key() {
    let uploader = Arc::new(FakeUploader::with_delay(Duration::from_millis(100)));
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;
    fixture.write("a.jpg", b"B1").await;

    let coordinator = fixture.coordinator.clone();
    let caller = tokio::spawn(async move { coordinator.ensure_uploaded("a.jpg").await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    // The attempt keeps running; a new caller joins it or sees its commit
    let resolution = fixture.coordinator.ensure_uploaded("a.jpg").await.unwrap();
    assert_eq!(uploader.calls(), 1);
    assert_eq!(
        fixture
            .coordinator
            .store()
            .get(&CacheKey::from_relative("a.jpg").unwrap())
            .await
            .unwrap()
            .remote_id(),
        resolution.remote_id()
    );
    assert_eq!(fixture.coordinator.in_flight(), 0);
}

#[tokio::test]
async fn test_missing_asset_never_reaches_uploader() {
    let uploader = Arc::new(FakeUploader::default());
    let fixture = Fixture::new(Arc::clone(&uploader), UploadOptions::default()).await;

    let err = fixture
        .coordinator
        .ensure_uploaded("never_uploaded.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), MediaCacheErrorKind::Asset(_)));
    assert_eq!(uploader.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_limit_bounds_simultaneous_uploads() {
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MediaUploader for Gauge {
        async fn upload(
            &self,
            asset: &Asset,
            _kind: MediaKind,
            _destination: &UploadDestination,
        ) -> MediaCacheResult<String> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("id-{}", asset.key()))
        }
    }

    let temp_dir = TempDir::new().unwrap();
    let assets = temp_dir.path().join("assets");
    tokio::fs::create_dir_all(&assets).await.unwrap();
    for i in 0..8 {
        tokio::fs::write(assets.join(format!("{i}.png")), format!("img {i}"))
            .await
            .unwrap();
    }

    let gauge = Arc::new(Gauge {
        current: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let store = Arc::new(CacheStore::open(temp_dir.path().join("cache.json")).await.unwrap());
    let coordinator = UploadCoordinator::new(
        &assets,
        UploadDestination::new("@storage"),
        store,
        Arc::clone(&gauge) as Arc<dyn MediaUploader>,
        UploadOptions::default().with_max_concurrent(2),
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator.ensure_uploaded(format!("{i}.png")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(coordinator.store().len().await, 8);
}
