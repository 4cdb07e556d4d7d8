//! Content extraction
//!
//! Each media kind has one `Extractor`, selected through `ExtractorRegistry`.
//! Extractors turn a file into ordered content units:
//! - Text sections anchored to their page, slide or position
//! - Image assets written into the run's work directory
//! - OCR text recognized in rendered pages
//! - At most one audio asset
//!
//! Extraction failures abort the whole file.

mod audio;
mod ooxml;
mod pdf;
mod slides;
mod tool;
mod video;
mod word;

pub use audio::AudioExtractor;
pub use pdf::PdfExtractor;
pub use slides::SlideDeckExtractor;
pub use video::VideoExtractor;
pub use word::WordDocumentExtractor;

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::models::{Anchor, ContentUnit, MediaAsset, MediaKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Output of one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub units: Vec<ContentUnit>,
}

impl ExtractionResult {
    pub fn push_text(&mut self, anchor: Anchor, body: impl Into<String>) {
        self.units.push(ContentUnit::Text {
            anchor,
            body: body.into(),
        });
    }

    pub fn push_image(&mut self, anchor: Anchor, asset: MediaAsset) {
        self.units.push(ContentUnit::Image { anchor, asset });
    }

    pub fn push_image_text(&mut self, anchor: Anchor, body: impl Into<String>) {
        self.units.push(ContentUnit::ImageText {
            anchor,
            body: body.into(),
        });
    }

    pub fn push_audio(&mut self, anchor: Anchor, asset: MediaAsset) {
        self.units.push(ContentUnit::Audio { anchor, asset });
    }

    /// Text sections in extraction order
    pub fn sections(&self) -> impl Iterator<Item = (Anchor, &str)> {
        self.units.iter().filter_map(|unit| match unit {
            ContentUnit::Text { anchor, body } => Some((*anchor, body.as_str())),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = (Anchor, &MediaAsset)> {
        self.units.iter().filter_map(|unit| match unit {
            ContentUnit::Image { anchor, asset } => Some((*anchor, asset)),
            _ => None,
        })
    }

    /// OCR text of rendered images
    pub fn image_texts(&self) -> impl Iterator<Item = (Anchor, &str)> {
        self.units.iter().filter_map(|unit| match unit {
            ContentUnit::ImageText { anchor, body } => Some((*anchor, body.as_str())),
            _ => None,
        })
    }

    pub fn audio(&self) -> Option<(Anchor, &MediaAsset)> {
        self.units.iter().find_map(|unit| match unit {
            ContentUnit::Audio { anchor, asset } => Some((*anchor, asset)),
            _ => None,
        })
    }
}

/// Turns a file of one media kind into content units
#[async_trait]
pub trait Extractor: Send + Sync {
    fn media_kind(&self) -> MediaKind;

    /// Extract `file`, writing any derived assets under `workdir`
    async fn extract(&self, file: &Path, workdir: &Path) -> Result<ExtractionResult>;
}

/// Dispatch table from media kind to extractor
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<MediaKind, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Registry with no extractors
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in extractor for every media kind
    pub fn from_config(config: &IngestConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(PdfExtractor::new(config));
        registry.register(SlideDeckExtractor);
        registry.register(WordDocumentExtractor);
        registry.register(VideoExtractor::new(config));
        registry.register(AudioExtractor);
        registry
    }

    /// Register an extractor, replacing any previous one for its kind
    pub fn register(&mut self, extractor: impl Extractor + 'static) {
        self.extractors
            .insert(extractor.media_kind(), Arc::new(extractor));
    }

    pub fn get(&self, kind: MediaKind) -> Result<Arc<dyn Extractor>> {
        self.extractors
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::Config(format!("No extractor registered for {}", kind)))
    }

    /// Extract `file` as `kind` into `workdir`
    pub async fn extract(
        &self,
        file: &Path,
        kind: MediaKind,
        workdir: &Path,
    ) -> Result<ExtractionResult> {
        let extractor = self.get(kind)?;
        if !file.exists() {
            return Err(Error::Extraction(format!(
                "File not found: {}",
                file.display()
            )));
        }
        tokio::fs::create_dir_all(workdir).await?;

        debug!("Extracting {} as {}", file.display(), kind);
        let result = extractor.extract(file, workdir).await?;
        info!(
            sections = result.sections().count(),
            images = result.images().count(),
            ocr = result.image_texts().count(),
            audio = result.audio().is_some(),
            "Extracted {}",
            file.display()
        );
        Ok(result)
    }
}
