//! Command handlers. None of them touch the network.

use media_cache::{MediaCacheConfig, asset_status};
use media_cache_error::MediaCacheResult;
use media_cache_storage::{CacheStore, resolve};

/// Print the cache state of every asset under the assets root.
pub async fn handle_status(config: &MediaCacheConfig) -> MediaCacheResult<()> {
    let store = CacheStore::open(config.cache_path()).await?;
    let statuses = asset_status(config.assets_root(), &store).await?;

    if statuses.is_empty() {
        println!("No assets in {}", config.assets_root().display());
        return Ok(());
    }
    for status in &statuses {
        println!("{:<48} {}", status.key(), status.state());
    }
    Ok(())
}

/// Print the remote id recorded for `name`.
pub async fn handle_lookup(config: &MediaCacheConfig, name: &str) -> MediaCacheResult<()> {
    let store = CacheStore::open(config.cache_path()).await?;
    let key = resolve(config.assets_root(), name)?;

    match store.get(&key).await {
        Some(entry) => println!("{}", entry.remote_id()),
        None => println!("{} is not cached", key),
    }
    Ok(())
}

/// Print every cache entry.
pub async fn handle_list(config: &MediaCacheConfig) -> MediaCacheResult<()> {
    let store = CacheStore::open(config.cache_path()).await?;
    let entries = store.entries().await;

    if entries.is_empty() {
        println!("Cache {} is empty", store.path().display());
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{:<40} {:<10} {} {}",
            entry.key(),
            entry.media_kind(),
            entry.uploaded_at().format("%Y-%m-%d %H:%M:%S"),
            entry.remote_id()
        );
    }
    Ok(())
}

/// Drop the entry for `name`.
pub async fn handle_invalidate(config: &MediaCacheConfig, name: &str) -> MediaCacheResult<()> {
    let store = CacheStore::open(config.cache_path()).await?;
    let key = resolve(config.assets_root(), name)?;

    match store.invalidate(&key).await? {
        Some(entry) => println!("Forgot {} ({})", key, entry.remote_id()),
        None => println!("{} was not cached", key),
    }
    Ok(())
}

/// Drop every entry and delete the cache file.
pub async fn handle_clear(config: &MediaCacheConfig) -> MediaCacheResult<()> {
    let store = CacheStore::open(config.cache_path()).await?;
    let cleared = store.clear().await?;
    println!("Cleared {} cached file ids", cleared);
    Ok(())
}
