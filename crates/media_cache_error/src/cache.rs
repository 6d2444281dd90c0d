//! Cache store error types.

/// Kinds of cache store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CacheErrorKind {
    /// The persisted cache file could not be parsed
    #[display("Cache file corrupt: {}", _0)]
    Corrupt(String),
    /// The cache could not be written durably (disk full, permission denied, ...)
    #[display("Failed to persist cache: {}", _0)]
    PersistFailure(String),
}

/// Cache store error with location tracking.
///
/// # Examples
///
/// ```
/// use media_cache_error::{CacheError, CacheErrorKind};
///
/// let err = CacheError::new(CacheErrorKind::Corrupt("expected value at line 1".to_string()));
/// assert!(format!("{}", err).contains("corrupt"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cache Error: {} at line {} in {}", kind, line, file)]
pub struct CacheError {
    /// The kind of error that occurred
    pub kind: CacheErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CacheError {
    /// Create a new cache error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CacheErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
