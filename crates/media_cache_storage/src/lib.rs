//! Local asset identity and the persistent remote-id cache.
//!
//! This crate holds everything the upload cache needs that does not touch
//! the network:
//!
//! - **Identity**: [`CacheKey`] (logical name) and [`Fingerprint`] (SHA-256 of the bytes)
//! - **Classification**: [`MediaKind`] detection by file extension
//! - **Enumeration**: [`scan_assets`] walks the assets root
//! - **Persistence**: [`CacheStore`] owns the on-disk mapping with atomic writes
//!
//! # Example
//!
//! ```rust
//! use media_cache_storage::{CacheEntry, CacheKey, CacheStore, Fingerprint, MediaKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CacheStore::open("/tmp/media_cache.json").await?;
//!
//! let key = CacheKey::from_relative("welcome.png")?;
//! let entry = CacheEntry::new(
//!     key.clone(),
//!     "AgACAgIAAxkDAAIB",
//!     Fingerprint::of_bytes(b"png bytes"),
//!     MediaKind::Photo,
//! );
//! store.put(entry).await?;
//!
//! assert_eq!(store.get(&key).await.unwrap().remote_id(), "AgACAgIAAxkDAAIB");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod asset;
mod entry;
mod identity;
mod media_kind;
mod store;

pub use asset::{Asset, AssetDescriptor, scan_assets};
pub use entry::CacheEntry;
pub use identity::{CacheKey, Fingerprint, fingerprint, resolve};
pub use media_cache_error::{CacheError, CacheErrorKind};
pub use media_kind::MediaKind;
pub use store::CacheStore;
