//! Remote upload error types.

/// Kinds of upload errors.
///
/// The cause is opaque to the cache: whatever the transport reports is kept
/// as a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum UploadErrorKind {
    /// The transport or remote service rejected the upload
    #[display("Upload failed: {}", _0)]
    Transport(String),
    /// The upload did not finish in time
    #[display("Upload timed out: {}", _0)]
    Timeout(String),
    /// The upload attempt was torn down before it produced an outcome
    #[display("Upload aborted: {}", _0)]
    Aborted(String),
    /// The remote service does not accept this kind of media
    #[display("Unsupported media: {}", _0)]
    Unsupported(String),
}

/// Upload error with location tracking.
///
/// # Examples
///
/// ```
/// use media_cache_error::{UploadError, UploadErrorKind};
///
/// let err = UploadError::new(UploadErrorKind::Transport("429 Too Many Requests".to_string()));
/// assert!(format!("{}", err).contains("429"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upload Error: {} at line {} in {}", kind, line, file)]
pub struct UploadError {
    /// The kind of error that occurred
    pub kind: UploadErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UploadError {
    /// Create a new upload error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UploadErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a transport failure.
    #[track_caller]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Transport(message.into()))
    }
}
