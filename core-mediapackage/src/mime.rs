//! MIME types and extension lookup

use crate::error::{MediaPackageError, Result};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A `type/subtype` MIME type, without parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeType {
    media_type: String,
    subtype: String,
}

impl MimeType {
    pub fn new(media_type: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into().to_lowercase(),
            subtype: subtype.into().to_lowercase(),
        }
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn is_video(&self) -> bool {
        self.media_type == "video"
    }

    pub fn is_audio(&self) -> bool {
        self.media_type == "audio"
    }

    pub fn is_image(&self) -> bool {
        self.media_type == "image"
    }

    pub fn is_xml(&self) -> bool {
        self.subtype == "xml" || self.subtype.ends_with("+xml")
    }

    /// Guesses the MIME type from the file extension of `uri`.
    pub fn from_uri(uri: &Url) -> Option<MimeType> {
        let file_name = uri.path_segments()?.last()?;
        let (_, extension) = file_name.rsplit_once('.')?;
        Self::from_extension(extension)
    }

    pub fn from_extension(extension: &str) -> Option<MimeType> {
        let extension = extension.to_lowercase();
        EXTENSIONS
            .iter()
            .find(|(ext, _)| *ext == extension)
            .and_then(|(_, mime)| mime.parse().ok())
    }
}

// Extension table for the formats commonly found in media packages.
const EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("avi", "video/x-msvideo"),
    ("flv", "video/x-flv"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("m3u8", "application/x-mpegurl"),
    ("mpd", "application/dash+xml"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("wav", "audio/x-wav"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
    ("opus", "audio/opus"),
    ("xml", "text/xml"),
    ("smil", "application/smil+xml"),
    ("json", "application/json"),
    ("vtt", "text/vtt"),
    ("srt", "text/x-subrip"),
    ("dfxp", "application/ttml+xml"),
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
];

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.subtype)
    }
}

impl FromStr for MimeType {
    type Err = MediaPackageError;

    fn from_str(s: &str) -> Result<Self> {
        // Parameters such as "; charset=utf-8" are dropped
        let essence = s.split(';').next().unwrap_or_default().trim();
        match essence.split_once('/') {
            Some((media_type, subtype)) if !media_type.is_empty() && !subtype.is_empty() => {
                Ok(Self::new(media_type, subtype))
            }
            _ => Err(MediaPackageError::InvalidArgument {
                field: "mimetype".to_string(),
                message: format!("'{}' is not a valid mime type", s),
            }),
        }
    }
}
