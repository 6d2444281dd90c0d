//! Error types for the media_cache workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Every error type is `Clone`, so one failed upload attempt can be handed to
//! every caller waiting on it.
//!
//! # Examples
//!
//! ```
//! use media_cache_error::{AssetError, AssetErrorKind, MediaCacheResult};
//!
//! fn read_asset() -> MediaCacheResult<Vec<u8>> {
//!     Err(AssetError::new(AssetErrorKind::Unreadable("a.jpg: permission denied".into())))?
//! }
//!
//! assert!(read_asset().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod asset;
mod cache;
mod config;
mod error;
mod upload;

pub use asset::{AssetError, AssetErrorKind};
pub use cache::{CacheError, CacheErrorKind};
pub use config::ConfigError;
pub use error::{MediaCacheError, MediaCacheErrorKind, MediaCacheResult};
pub use upload::{UploadError, UploadErrorKind};
