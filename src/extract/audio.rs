//! Audio files are transcribed as-is

use super::{ExtractionResult, Extractor};
use crate::error::Result;
use crate::models::{Anchor, MediaAsset, MediaKind};
use async_trait::async_trait;
use std::path::Path;

pub struct AudioExtractor;

#[async_trait]
impl Extractor for AudioExtractor {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Audio
    }

    async fn extract(&self, file: &Path, _workdir: &Path) -> Result<ExtractionResult> {
        let mut result = ExtractionResult::default();
        result.push_audio(Anchor::Whole, MediaAsset::from_path(file));
        Ok(result)
    }
}
