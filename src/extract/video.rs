//! Video: sampled frames plus the audio track, both through ffmpeg

use super::tool;
use super::{ExtractionResult, Extractor};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::models::{Anchor, MediaAsset, MediaKind};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, warn};

const FRAME_PREFIX: &str = "frame_";
const AUDIO_TRACK: &str = "audio.wav";

pub struct VideoExtractor {
    ffmpeg_bin: String,
    frame_interval_secs: u64,
}

impl VideoExtractor {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            frame_interval_secs: config.frame_interval_secs.max(1),
        }
    }

    /// One frame every `frame_interval_secs`, anchored at its offset
    async fn sample_frames(&self, file: &Path, workdir: &Path) -> Result<Vec<(u64, MediaAsset)>> {
        let filter = format!("fps=1/{}", self.frame_interval_secs);
        let pattern = workdir.join(format!("{}%04d.jpg", FRAME_PREFIX));
        tool::run(
            &self.ffmpeg_bin,
            [
                OsStr::new("-y"),
                OsStr::new("-i"),
                file.as_os_str(),
                OsStr::new("-vf"),
                OsStr::new(&filter),
                pattern.as_os_str(),
            ],
        )
        .await?;

        // ffmpeg numbers frames from 1
        Ok(tool::numbered_files(workdir, FRAME_PREFIX, "jpg")?
            .into_iter()
            .map(|(n, path)| {
                let offset = u64::from(n.saturating_sub(1)) * self.frame_interval_secs;
                (offset, MediaAsset::from_path(path))
            })
            .collect())
    }

    /// Mono 16kHz PCM, the format speech-to-text services expect
    async fn extract_audio(&self, file: &Path, workdir: &Path) -> Result<MediaAsset> {
        let dest = workdir.join(AUDIO_TRACK);
        tool::run(
            &self.ffmpeg_bin,
            [
                OsStr::new("-y"),
                OsStr::new("-i"),
                file.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-acodec"),
                OsStr::new("pcm_s16le"),
                OsStr::new("-ac"),
                OsStr::new("1"),
                OsStr::new("-ar"),
                OsStr::new("16000"),
                dest.as_os_str(),
            ],
        )
        .await?;
        Ok(MediaAsset::from_path(dest))
    }
}

#[async_trait]
impl Extractor for VideoExtractor {
    fn media_kind(&self) -> MediaKind {
        MediaKind::Video
    }

    async fn extract(&self, file: &Path, workdir: &Path) -> Result<ExtractionResult> {
        let frames = self.sample_frames(file, workdir).await?;
        debug!("Sampled {} frames from {}", frames.len(), file.display());

        let mut result = ExtractionResult::default();
        match self.extract_audio(file, workdir).await {
            Ok(asset) => result.push_audio(Anchor::Whole, asset),
            Err(e) => warn!("No audio track extracted from {}: {}", file.display(), e),
        }
        for (offset, asset) in frames {
            result.push_image(Anchor::Timestamp(offset), asset);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = IngestConfig {
            frame_interval_secs: 0,
            ..IngestConfig::default()
        };
        assert_eq!(VideoExtractor::new(&config).frame_interval_secs, 1);
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_fails_extraction() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("lecture.mp4");
        std::fs::write(&file, b"\0\0\0\x18ftyp").unwrap();

        let config = IngestConfig {
            ffmpeg_bin: "studyrag-missing-ffmpeg".to_string(),
            ..IngestConfig::default()
        };
        let result = VideoExtractor::new(&config).extract(&file, tmp.path()).await;
        assert!(matches!(result, Err(Error::Extraction(msg)) if msg.contains("not found")));
    }
}
