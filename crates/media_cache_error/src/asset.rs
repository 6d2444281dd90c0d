//! Local asset error types.

/// Kinds of local asset errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum AssetErrorKind {
    /// The asset file could not be opened or read
    #[display("Asset unreadable: {}", _0)]
    Unreadable(String),
    /// The assets root does not exist or is not a directory
    #[display("Assets root not found: {}", _0)]
    RootNotFound(String),
    /// The asset path cannot be turned into a cache key
    #[display("Invalid asset path: {}", _0)]
    InvalidPath(String),
}

/// Asset error with location tracking.
///
/// # Examples
///
/// ```
/// use media_cache_error::{AssetError, AssetErrorKind};
///
/// let err = AssetError::new(AssetErrorKind::RootNotFound("/srv/assets".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Asset Error: {} at line {} in {}", kind, line, file)]
pub struct AssetError {
    /// The kind of error that occurred
    pub kind: AssetErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl AssetError {
    /// Create a new asset error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: AssetErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
