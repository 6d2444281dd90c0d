//! Media kind enumeration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of media, which decides how the uploader sends an asset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    /// Still images (JPEG, PNG, WebP)
    Photo,
    /// Video clips (MP4, MOV, WebM, MKV)
    Video,
    /// Audio tracks (MP3, OGG, M4A, FLAC, WAV)
    Audio,
    /// Animated images (GIF)
    Animation,
    /// Anything else, sent as a generic document
    Document,
}

impl MediaKind {
    /// Classify a file by its extension (case-insensitive).
    ///
    /// Pure: the file is never opened.
    ///
    /// ```
    /// use media_cache_storage::MediaKind;
    ///
    /// assert_eq!(MediaKind::detect("cover.JPG"), MediaKind::Photo);
    /// assert_eq!(MediaKind::detect("intro.mp4"), MediaKind::Video);
    /// assert_eq!(MediaKind::detect("notes.pdf"), MediaKind::Document);
    /// ```
    pub fn detect(path: impl AsRef<Path>) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "jpg" | "jpeg" | "png" | "webp" => MediaKind::Photo,
            "mp4" | "mov" | "webm" | "mkv" => MediaKind::Video,
            "mp3" | "ogg" | "oga" | "m4a" | "flac" | "wav" => MediaKind::Audio,
            "gif" => MediaKind::Animation,
            _ => MediaKind::Document,
        }
    }

    /// Convert to the string stored in the cache file.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}
