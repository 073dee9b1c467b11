use std::fmt;

use serde::{Deserialize, Serialize};

/// Video container formats an asset may be stored as.
///
/// The set is closed: the file extension written to disk always comes from
/// this table, never from client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    Mp4,
    M4v,
    Webm,
    Mov,
    Mkv,
    Avi,
    Ogv,
    Mpeg,
    #[serde(rename = "3gp")]
    ThreeGp,
    Wmv,
    Flv,
}

impl AssetFormat {
    /// Every known format, in lookup order (most common first).
    pub const ALL: [Self; 11] = [
        Self::Mp4,
        Self::Webm,
        Self::Mov,
        Self::M4v,
        Self::Mkv,
        Self::Avi,
        Self::Ogv,
        Self::Mpeg,
        Self::ThreeGp,
        Self::Wmv,
        Self::Flv,
    ];

    /// Format used when neither the filename nor the media type identifies one.
    pub const FALLBACK: Self = Self::Mp4;

    /// File extension without the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::M4v => "m4v",
            Self::Webm => "webm",
            Self::Mov => "mov",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
            Self::Ogv => "ogv",
            Self::Mpeg => "mpeg",
            Self::ThreeGp => "3gp",
            Self::Wmv => "wmv",
            Self::Flv => "flv",
        }
    }

    /// Canonical media type served for this format.
    #[must_use]
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::M4v => "video/x-m4v",
            Self::Webm => "video/webm",
            Self::Mov => "video/quicktime",
            Self::Mkv => "video/x-matroska",
            Self::Avi => "video/x-msvideo",
            Self::Ogv => "video/ogg",
            Self::Mpeg => "video/mpeg",
            Self::ThreeGp => "video/3gpp",
            Self::Wmv => "video/x-ms-wmv",
            Self::Flv => "video/x-flv",
        }
    }

    /// Look up a format by extension (case-insensitive, leading dot optional).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext).to_ascii_lowercase();
        let found = match ext.as_str() {
            "mpg" => Self::Mpeg,
            "qt" => Self::Mov,
            "ogg" => Self::Ogv,
            other => return Self::ALL.into_iter().find(|f| f.extension() == other),
        };
        Some(found)
    }

    /// Look up a format by declared media type, ignoring parameters.
    #[must_use]
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.media_type() == essence)
    }

    /// Pick a format from an uploaded file's declared name and media type.
    ///
    /// The filename's extension wins when it is recognised, then the media
    /// type, then [`FALLBACK`](Self::FALLBACK).
    #[must_use]
    pub fn detect(file_name: Option<&str>, media_type: Option<&str>) -> Self {
        file_name
            .and_then(|name| name.rsplit_once('.'))
            .and_then(|(_, ext)| Self::from_extension(ext))
            .or_else(|| media_type.and_then(Self::from_media_type))
            .unwrap_or(Self::FALLBACK)
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
