//! Configuration error types.

/// Settings that cannot be loaded or are unusable for uploading.
///
/// Raised by config loading and by `MediaCacheConfig::validate`; carries a
/// human-readable reason naming the offending setting.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Invalid media cache settings: {} (at {}:{})", message, file, line)]
pub struct ConfigError {
    /// Which setting is wrong and why
    pub message: String,
    /// Line of the failed check
    pub line: u32,
    /// Source file of the failed check
    pub file: &'static str,
}

impl ConfigError {
    /// Reject a setting, recording where the check failed.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_cache_error::ConfigError;
    ///
    /// let err = ConfigError::new("upload_destination is required");
    /// assert!(err.to_string().starts_with("Invalid media cache settings: upload_destination"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
