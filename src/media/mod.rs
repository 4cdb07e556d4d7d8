//! Describing images and transcribing audio
//!
//! Both calls go through soft-failure wrappers during ingestion: an error is
//! logged and replaced by a sentinel string so one bad asset never aborts a
//! document.

mod speech;
mod vision;

pub use speech::WhisperTranscriber;
pub use vision::{AnthropicVision, OpenAiVision, ANALYSIS_PROMPT};

use crate::config::{TranscriptionConfig, VisionConfig, VisionProvider};
use crate::error::Result;
use crate::models::MediaAsset;
use async_trait::async_trait;
use tracing::warn;

/// Stored in place of an image description that could not be produced
pub const IMAGE_SENTINEL: &str = "Unable to analyze image";

/// Stored in place of a transcript that could not be produced
pub const AUDIO_SENTINEL: &str = "Failed to transcribe audio";

/// Produces a study-oriented description of an image
#[async_trait]
pub trait VisualAnalyzer: Send + Sync {
    async fn describe(&self, image: &MediaAsset) -> Result<String>;
}

/// Turns an audio file into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &MediaAsset) -> Result<String>;
}

pub fn create_analyzer(config: &VisionConfig) -> Result<Box<dyn VisualAnalyzer>> {
    Ok(match config.provider {
        VisionProvider::Anthropic => Box::new(AnthropicVision::new(config)?),
        VisionProvider::Openai => Box::new(OpenAiVision::new(config)?),
    })
}

pub fn create_transcriber(config: &TranscriptionConfig) -> Result<Box<dyn Transcriber>> {
    Ok(Box::new(WhisperTranscriber::new(config)?))
}

/// Text produced for one asset, flagged when it is a sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub text: String,
    pub degraded: bool,
}

impl Analysis {
    fn sentinel(text: &str) -> Self {
        Self {
            text: text.to_string(),
            degraded: true,
        }
    }
}

pub async fn describe_or_sentinel(analyzer: &dyn VisualAnalyzer, image: &MediaAsset) -> Analysis {
    match analyzer.describe(image).await {
        Ok(text) => Analysis {
            text: text.trim().to_string(),
            degraded: false,
        },
        Err(e) => {
            warn!("Image analysis failed for {}: {}", image.path.display(), e);
            Analysis::sentinel(IMAGE_SENTINEL)
        }
    }
}

pub async fn transcribe_or_sentinel(transcriber: &dyn Transcriber, audio: &MediaAsset) -> Analysis {
    match transcriber.transcribe(audio).await {
        Ok(text) => Analysis {
            text: text.trim().to_string(),
            degraded: false,
        },
        Err(e) => {
            warn!("Transcription failed for {}: {}", audio.path.display(), e);
            Analysis::sentinel(AUDIO_SENTINEL)
        }
    }
}
