use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::unit::UnitId;

/// Kind of media the uploader accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Derive the kind from a declared media type such as `image/png`.
    ///
    /// Only the top-level type is considered; anything other than `image`
    /// or `video` yields `None`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let top_level = content_type
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        match top_level.as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A file as handed over by the selection surface: name, declared media
/// type and the raw bytes.
#[derive(Clone)]
pub struct RawFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl RawFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Byte size of the blob.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl std::fmt::Debug for RawFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RawFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Intrinsic attributes extracted from a raw file. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbedFile {
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// `data:image/jpeg;base64,...` URL of the square thumbnail.
    pub thumbnail: String,
}

/// A file that passed validation, still carrying its blob for upload.
#[derive(Debug, Clone)]
pub struct AcceptedFile {
    pub id: UnitId,
    pub kind: MediaKind,
    pub file: RawFile,
    pub thumbnail: String,
    pub width: u32,
    pub height: u32,
    pub duration: Option<f64>,
}

impl AcceptedFile {
    /// Strip the blob; this is what leaves the uploader in the `pick` event.
    pub fn picked(&self) -> PickedUnit {
        PickedUnit {
            id: self.id.clone(),
            kind: self.kind,
            thumbnail: self.thumbnail.clone(),
            width: self.width,
            height: self.height,
            duration: self.duration,
        }
    }
}

/// Accepted unit as published to observers (no file blob).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickedUnit {
    pub id: UnitId,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub thumbnail: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}
