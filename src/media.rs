//! Embedded media references (images, audio clips and PDF documents).
//!
//! Media can appear anywhere inside structured content. Its serialized form is
//! the only reserved shape in a content tree: an object carrying a `$media`
//! key naming the kind.
//!
//! ```json
//! {"$media": "image", "mime_type": "image/png", "source": {"base64": "iVBOR..."}}
//! ```

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AtomicError, Result};

/// Key marking an object as a media reference.
pub const MEDIA_TAG: &str = "$media";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Pdf,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Pdf => "pdf",
        }
    }

    fn default_mime_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/png",
            MediaKind::Audio => "audio/wav",
            MediaKind::Pdf => "application/pdf",
        }
    }
}

/// Where the media bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    Url(String),
    /// Standard base64 payload, no data-URL prefix.
    Base64(String),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Media {
    #[serde(rename = "$media")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub source: MediaSource,
}

impl Media {
    pub fn from_url(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            mime_type: None,
            source: MediaSource::Url(url.into()),
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::from_url(MediaKind::Image, url)
    }

    pub fn from_bytes(kind: MediaKind, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            kind,
            mime_type: Some(mime_type.into()),
            source: MediaSource::Base64(STANDARD.encode(bytes)),
        }
    }

    /// Reference a local file without reading it. Use [`Media::resolve`] before
    /// handing the media to a provider that needs the bytes inline.
    pub fn from_path(kind: MediaKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            mime_type: None,
            source: MediaSource::Path(path.into()),
        }
    }

    /// Read a file into an inline base64 payload.
    pub async fn read_file(kind: MediaKind, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime_type = guess_mime_type(path)
            .unwrap_or(kind.default_mime_type())
            .to_string();
        Ok(Self::from_bytes(kind, mime_type, &bytes))
    }

    /// Inline a path-backed source. URL and base64 sources are returned unchanged.
    pub async fn resolve(self) -> Result<Self> {
        match &self.source {
            MediaSource::Path(path) => {
                let mut resolved = Self::read_file(self.kind, path).await?;
                if self.mime_type.is_some() {
                    resolved.mime_type = self.mime_type;
                }
                Ok(resolved)
            }
            MediaSource::Url(_) | MediaSource::Base64(_) => Ok(self),
        }
    }

    pub fn mime_type(&self) -> &str {
        if let Some(mime) = &self.mime_type {
            return mime;
        }
        let guessed = match &self.source {
            MediaSource::Path(path) => guess_mime_type(path),
            MediaSource::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                guess_mime_type(Path::new(path))
            }
            MediaSource::Base64(_) => None,
        };
        guessed.unwrap_or(self.kind.default_mime_type())
    }

    /// URL suitable for provider payloads: remote URLs as-is, inline payloads
    /// as `data:` URLs. Unresolved paths have none.
    pub fn data_url(&self) -> Option<String> {
        match &self.source {
            MediaSource::Url(url) => Some(url.clone()),
            MediaSource::Base64(data) => Some(format!("data:{};base64,{data}", self.mime_type())),
            MediaSource::Path(_) => None,
        }
    }

    /// Raw bytes of an inline payload.
    pub fn decode(&self) -> Result<Vec<u8>> {
        match &self.source {
            MediaSource::Base64(data) => STANDARD
                .decode(data)
                .map_err(|err| AtomicError::validation("$.source.base64", err)),
            _ => Err(AtomicError::Protocol(format!(
                "{} media is not inline",
                self.kind.as_str()
            ))),
        }
    }
}

fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}
