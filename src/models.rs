//! Core domain types shared by the ingestion and retrieval paths.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Kind of study material, selects the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    TextDocument,
    SlideDeck,
    WordDocument,
    Video,
    Audio,
}

impl MediaKind {
    pub const ALL: [MediaKind; 5] = [
        MediaKind::TextDocument,
        MediaKind::SlideDeck,
        MediaKind::WordDocument,
        MediaKind::Video,
        MediaKind::Audio,
    ];

    /// Resolve a media kind from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" | "txt" | "md" => Ok(MediaKind::TextDocument),
            "pptx" => Ok(MediaKind::SlideDeck),
            "docx" => Ok(MediaKind::WordDocument),
            "mp4" | "mov" | "avi" | "mkv" | "webm" => Ok(MediaKind::Video),
            "mp3" | "wav" | "m4a" | "ogg" | "flac" => Ok(MediaKind::Audio),
            other => Err(Error::Config(format!("Unsupported file type: {}", other))),
        }
    }

    /// Resolve a media kind from a file path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Unsupported file type: {} has no extension",
                    path.display()
                ))
            })?;
        Self::from_extension(ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::TextDocument => "text_document",
            MediaKind::SlideDeck => "slide_deck",
            MediaKind::WordDocument => "word_document",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "text_document" | "text" | "document" => Ok(MediaKind::TextDocument),
            "slide_deck" | "slides" => Ok(MediaKind::SlideDeck),
            "word_document" | "word" => Ok(MediaKind::WordDocument),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            other => MediaKind::from_extension(other),
        }
    }
}

/// Identity of one uploaded file, copied into every record derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAsset {
    pub document_id: String,
    pub filename: String,
    pub media_kind: MediaKind,
    pub upload_time: DateTime<Utc>,
}

impl DocumentAsset {
    pub fn new(filename: impl Into<String>, media_kind: MediaKind) -> Self {
        Self {
            document_id: new_document_id(),
            filename: filename.into(),
            media_kind,
            upload_time: Utc::now(),
        }
    }
}

/// Generate a fresh document id (`doc_<hex>`)
pub fn new_document_id() -> String {
    format!("doc_{}", Uuid::new_v4().simple())
}

/// Original position of an extracted unit.
///
/// Ordering follows the derive: variant first, then the position value.
/// Units of one extraction always share a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "at")]
pub enum Anchor {
    /// Whole-file unit (audio track, single text stream)
    Whole,
    /// 1-based page number
    Page(u32),
    /// 1-based slide number
    Slide(u32),
    /// Seconds from the start of a recording
    Timestamp(u64),
    /// Order of appearance inside a flowing document
    Inline(u32),
}

/// Image or audio file produced by extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub mime: String,
}

impl MediaAsset {
    /// Build an asset, guessing its MIME type from the extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self { path, mime }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string())
    }
}

/// One unit yielded by an extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentUnit {
    Text { anchor: Anchor, body: String },
    Image { anchor: Anchor, asset: MediaAsset },
    /// Text recognized inside a rendered image
    ImageText { anchor: Anchor, body: String },
    Audio { anchor: Anchor, asset: MediaAsset },
}

impl ContentUnit {
    pub fn anchor(&self) -> Anchor {
        match self {
            ContentUnit::Text { anchor, .. }
            | ContentUnit::Image { anchor, .. }
            | ContentUnit::ImageText { anchor, .. }
            | ContentUnit::Audio { anchor, .. } => *anchor,
        }
    }
}

/// What a stored record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Extracted text merged with its visual/audio annotations
    Combined,
    /// Raw extracted text
    Text,
    /// Description of one image asset
    ImageDescription,
    /// OCR text of one rendered page
    Ocr,
    /// Transcript of the audio track
    Transcript,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Combined => "combined",
            ContentType::Text => "text",
            ContentType::ImageDescription => "image_description",
            ContentType::Ocr => "ocr",
            ContentType::Transcript => "transcript",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "combined" => Ok(ContentType::Combined),
            "text" => Ok(ContentType::Text),
            "image_description" => Ok(ContentType::ImageDescription),
            "ocr" => Ok(ContentType::Ocr),
            "transcript" => Ok(ContentType::Transcript),
            other => Err(Error::Config(format!("Unknown content type: {}", other))),
        }
    }
}

/// A chunk ready to become a vector record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    pub document_id: String,
    pub chunk_index: usize,
    pub content_type: ContentType,
    pub body: String,
    /// Body contains a soft-failure sentinel
    pub degraded: bool,
}

impl ContentChunk {
    pub fn record_id(&self) -> String {
        record_id(&self.document_id, self.content_type, self.chunk_index)
    }
}

/// Deterministic record id for `(document, content type, index)`
pub fn record_id(document_id: &str, content_type: ContentType, chunk_index: usize) -> String {
    format!("{}_{}_{}", document_id, content_type.as_str(), chunk_index)
}

/// Metadata stored alongside every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub chunk_index: usize,
    pub content_type: ContentType,
    pub filename: String,
    pub media_kind: MediaKind,
    /// RFC 3339 upload timestamp
    pub upload_time: String,
    /// blake3 hash of the record body
    pub chunk_hash: String,
    #[serde(default)]
    pub degraded: bool,
}

impl ChunkMetadata {
    pub fn for_chunk(asset: &DocumentAsset, chunk: &ContentChunk) -> Self {
        Self {
            document_id: asset.document_id.clone(),
            chunk_index: chunk.chunk_index,
            content_type: chunk.content_type,
            filename: asset.filename.clone(),
            media_kind: asset.media_kind,
            upload_time: asset.upload_time.to_rfc3339(),
            chunk_hash: blake3::hash(chunk.body.as_bytes()).to_hex().to_string(),
            degraded: chunk.degraded,
        }
    }

    /// Flat JSON object as stored by the vector store
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A record before embedding
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
}

impl VectorRecord {
    pub fn from_chunk(asset: &DocumentAsset, chunk: &ContentChunk) -> Self {
        Self {
            id: chunk.record_id(),
            document: chunk.body.clone(),
            metadata: ChunkMetadata::for_chunk(asset, chunk),
        }
    }
}

/// One hit returned by the vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    /// Absent when the store was read without a query
    pub distance: Option<f32>,
}

impl RetrievalResult {
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get("document_id").and_then(Value::as_str)
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.metadata
            .get("content_type")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata
            .get("degraded")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("PDF").unwrap(), MediaKind::TextDocument);
        assert_eq!(MediaKind::from_extension("pptx").unwrap(), MediaKind::SlideDeck);
        assert_eq!(MediaKind::from_extension("mov").unwrap(), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("wav").unwrap(), MediaKind::Audio);
        assert!(matches!(
            MediaKind::from_extension("xlsx"),
            Err(Error::Config(_))
        ));
        assert!(MediaKind::from_path(Path::new("notes")).is_err());
    }

    #[test]
    fn test_media_kind_from_str_accepts_names_and_extensions() {
        assert_eq!("slide-deck".parse::<MediaKind>().unwrap(), MediaKind::SlideDeck);
        assert_eq!("docx".parse::<MediaKind>().unwrap(), MediaKind::WordDocument);
    }

    #[test]
    fn test_record_id_is_deterministic() {
        let a = record_id("doc_1", ContentType::ImageDescription, 2);
        let b = record_id("doc_1", ContentType::ImageDescription, 2);
        assert_eq!(a, b);
        assert_eq!(a, "doc_1_image_description_2");
        assert_ne!(a, record_id("doc_1", ContentType::Text, 2));
    }

    #[test]
    fn test_document_id_shape() {
        let id = new_document_id();
        assert!(id.starts_with("doc_"));
        assert_eq!(id.len(), 4 + 32);
        assert_ne!(id, new_document_id());
    }

    #[test]
    fn test_anchor_ordering() {
        let mut anchors = vec![Anchor::Slide(3), Anchor::Slide(1), Anchor::Slide(2)];
        anchors.sort();
        assert_eq!(anchors, vec![Anchor::Slide(1), Anchor::Slide(2), Anchor::Slide(3)]);
        assert!(Anchor::Timestamp(30) < Anchor::Timestamp(60));
    }

    #[test]
    fn test_metadata_map_roundtrip_fields() {
        let asset = DocumentAsset::new("lecture.pdf", MediaKind::TextDocument);
        let chunk = ContentChunk {
            document_id: asset.document_id.clone(),
            chunk_index: 0,
            content_type: ContentType::ImageDescription,
            body: "A bar chart".to_string(),
            degraded: false,
        };
        let record = VectorRecord::from_chunk(&asset, &chunk);
        let map = record.metadata.to_map();
        assert_eq!(map["content_type"], "image_description");
        assert_eq!(map["media_kind"], "text_document");
        assert_eq!(map["filename"], "lecture.pdf");

        let hit = RetrievalResult {
            id: record.id.clone(),
            content: record.document.clone(),
            metadata: map,
            distance: Some(0.1),
        };
        assert_eq!(hit.document_id(), Some(asset.document_id.as_str()));
        assert_eq!(hit.content_type(), Some(ContentType::ImageDescription));
        assert!(!hit.is_degraded());
    }

    #[test]
    fn test_media_asset_mime_guess() {
        let asset = MediaAsset::from_path("/tmp/frame_001.jpg");
        assert_eq!(asset.mime, "image/jpeg");
        assert_eq!(asset.file_name(), "frame_001.jpg");
    }
}
