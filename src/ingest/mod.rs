//! Ingestion pipeline
//!
//! One file at a time:
//! 1. Resolve the media kind and create the document identity
//! 2. Extract content units into a per-run work directory
//! 3. Describe images and transcribe audio on a bounded pool
//! 4. Combine text with the analyses in anchor order
//! 5. Chunk every content stream and upsert all records in one write

mod combine;

pub use combine::{combine, raw_text, Described};

use crate::chunk::Chunker;
use crate::config::{Config, IngestConfig};
use crate::error::{Error, Result};
use crate::extract::ExtractorRegistry;
use crate::media::{
    describe_or_sentinel, transcribe_or_sentinel, Analysis, Transcriber, VisualAnalyzer,
    AUDIO_SENTINEL, IMAGE_SENTINEL,
};
use crate::models::{Anchor, ContentChunk, ContentType, DocumentAsset, MediaAsset, MediaKind, VectorRecord};
use crate::progress::StepProgress;
use crate::store::ChromaStore;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-file ingestion options
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Media kind; resolved from the extension when absent
    pub kind: Option<MediaKind>,
    /// Reuse an existing document id so its records are overwritten
    pub document_id: Option<String>,
}

/// Outcome of ingesting one file
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub filename: String,
    pub media_kind: MediaKind,
    /// Records written per content type
    pub counts: BTreeMap<String, usize>,
    /// Images that received a usable description; blank and sentinel
    /// results are not counted
    pub images_analyzed: usize,
    /// Assets whose analysis fell back to a sentinel
    pub degraded_assets: usize,
    pub has_transcript: bool,
    pub records: usize,
    /// Whether the vector store accepted the write
    pub stored: bool,
}

/// Whether files of `kind` at `path` produce images needing description
pub fn requires_vision(kind: MediaKind, path: &Path, config: &IngestConfig) -> bool {
    match kind {
        MediaKind::Audio => false,
        MediaKind::TextDocument => {
            config.render_pdf_pages
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        }
        MediaKind::SlideDeck | MediaKind::WordDocument | MediaKind::Video => true,
    }
}

pub fn requires_transcription(kind: MediaKind) -> bool {
    matches!(kind, MediaKind::Video | MediaKind::Audio)
}

pub struct Ingestor<'a> {
    store: &'a ChromaStore,
    registry: ExtractorRegistry,
    analyzer: Option<Box<dyn VisualAnalyzer>>,
    transcriber: Option<Box<dyn Transcriber>>,
    chunker: Chunker,
    config: IngestConfig,
    show_progress: bool,
}

impl<'a> Ingestor<'a> {
    /// Pipeline with the built-in extractors and no analysis services
    pub fn new(store: &'a ChromaStore, config: &Config) -> Self {
        Self {
            store,
            registry: ExtractorRegistry::from_config(&config.ingest),
            analyzer: None,
            transcriber: None,
            chunker: Chunker::from_config(&config.chunk),
            config: config.ingest.clone(),
            show_progress: false,
        }
    }

    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn VisualAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Ingest one file. Extraction and embedding failures abort; store
    /// failures are reported through `IngestReport::stored`.
    pub async fn ingest(&self, file: &Path, options: IngestOptions) -> Result<IngestReport> {
        let kind = match options.kind {
            Some(kind) => kind,
            None => MediaKind::from_path(file)?,
        };
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        let asset = match options.document_id {
            Some(document_id) => DocumentAsset {
                document_id,
                filename,
                media_kind: kind,
                upload_time: Utc::now(),
            },
            None => DocumentAsset::new(filename, kind),
        };

        let workdir = self.config.temp_dir.join(&asset.document_id);
        info!(
            document_id = %asset.document_id,
            kind = %kind,
            "Ingesting {}",
            file.display()
        );

        let result = self.run(file, &asset, &workdir).await;
        if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Could not remove {}: {}", workdir.display(), e);
            }
        }
        result
    }

    async fn run(&self, file: &Path, asset: &DocumentAsset, workdir: &Path) -> Result<IngestReport> {
        let kind = asset.media_kind;
        let extraction = self.registry.extract(file, kind, workdir).await?;

        let mut sections: Vec<(Anchor, String)> = extraction
            .sections()
            .map(|(anchor, body)| (anchor, body.to_string()))
            .collect();
        sections.sort_by_key(|(anchor, _)| *anchor);
        let images: Vec<(Anchor, MediaAsset)> = extraction
            .images()
            .map(|(anchor, asset)| (anchor, asset.clone()))
            .collect();
        let mut image_text: Vec<(Anchor, String)> = extraction
            .image_texts()
            .map(|(anchor, body)| (anchor, body.to_string()))
            .collect();
        image_text.sort_by_key(|(anchor, _)| *anchor);
        let audio = extraction.audio().map(|(_, asset)| asset.clone());

        let (descriptions, transcript) =
            tokio::join!(self.describe_all(images), self.transcribe(audio));
        let descriptions = descriptions?;
        let transcript = transcript?;

        let chunks = build_chunks(
            &asset.document_id,
            kind,
            &sections,
            &descriptions,
            &image_text,
            transcript.as_ref(),
            &self.chunker,
        );
        if chunks.is_empty() {
            return Err(Error::Extraction(format!(
                "No content extracted from {}",
                file.display()
            )));
        }

        let mut counts = BTreeMap::new();
        for chunk in &chunks {
            *counts.entry(chunk.content_type.as_str().to_string()).or_insert(0) += 1;
        }
        let degraded_assets = descriptions.iter().filter(|(_, a)| a.degraded).count()
            + transcript.as_ref().map_or(0, |t| usize::from(t.degraded));

        let records: Vec<VectorRecord> = chunks
            .iter()
            .map(|chunk| VectorRecord::from_chunk(asset, chunk))
            .collect();

        let stored = self.persist(&records).await?;
        info!(
            document_id = %asset.document_id,
            records = records.len(),
            degraded = degraded_assets,
            stored,
            "Finished {}",
            asset.filename
        );

        Ok(IngestReport {
            document_id: asset.document_id.clone(),
            filename: asset.filename.clone(),
            media_kind: kind,
            counts,
            images_analyzed: usable_descriptions(&descriptions),
            degraded_assets,
            has_transcript: transcript.is_some_and(|t| !t.degraded && !t.text.is_empty()),
            records: records.len(),
            stored,
        })
    }

    /// Describe every image, at most `max_concurrent_assets` at a time.
    ///
    /// Results come back in anchor order regardless of completion order.
    async fn describe_all(&self, images: Vec<(Anchor, MediaAsset)>) -> Result<Vec<(Anchor, Analysis)>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }
        let analyzer = self.analyzer.as_deref().ok_or_else(|| {
            Error::Config("Images found but no vision provider is configured".to_string())
        })?;

        let progress = StepProgress::start(images.len(), "Analyzing images", self.show_progress);
        let progress_ref = &progress;
        let mut described: Vec<(usize, Anchor, Analysis)> = stream::iter(images.into_iter().enumerate())
            .map(|(position, (anchor, image))| async move {
                let analysis = describe_or_sentinel(analyzer, &image).await;
                progress_ref.advance();
                (position, anchor, analysis)
            })
            .buffer_unordered(self.config.max_concurrent_assets.max(1))
            .collect()
            .await;
        progress.finish("Images analyzed");

        described.sort_by_key(|(position, anchor, _)| (*anchor, *position));
        Ok(described
            .into_iter()
            .map(|(_, anchor, analysis)| (anchor, analysis))
            .collect())
    }

    async fn transcribe(&self, audio: Option<MediaAsset>) -> Result<Option<Analysis>> {
        let Some(audio) = audio else {
            return Ok(None);
        };
        let transcriber = self.transcriber.as_deref().ok_or_else(|| {
            Error::Config("Audio found but no transcription service is configured".to_string())
        })?;
        Ok(Some(transcribe_or_sentinel(transcriber, &audio).await))
    }

    async fn persist(&self, records: &[VectorRecord]) -> Result<bool> {
        if !self.store.ensure_database().await {
            warn!("Database check failed; trying the collection anyway");
        }
        let collection = self.store.collection_name().to_string();
        if !self.store.ensure_collection(&collection).await {
            warn!("Collection {} unavailable; nothing stored", collection);
            return Ok(false);
        }
        self.store.upsert(records).await
    }
}

/// Chunk all content streams of one document.
///
/// Indexes are contiguous per content type, starting at zero.
pub fn build_chunks(
    document_id: &str,
    kind: MediaKind,
    sections: &[(Anchor, String)],
    descriptions: &[(Anchor, Analysis)],
    image_text: &[(Anchor, String)],
    transcript: Option<&Analysis>,
    chunker: &Chunker,
) -> Vec<ContentChunk> {
    let described: Vec<Described<'_>> = descriptions
        .iter()
        .map(|(anchor, analysis)| Described {
            anchor: *anchor,
            text: analysis.text.as_str(),
        })
        .collect();
    let recognized: Vec<Described<'_>> = image_text
        .iter()
        .map(|(anchor, text)| Described {
            anchor: *anchor,
            text: text.as_str(),
        })
        .collect();
    let blocks = combine(
        kind,
        sections,
        &described,
        &recognized,
        transcript.map(|t| t.text.as_str()),
    );

    let mut chunks = Vec::new();
    let mut push = |content_type: ContentType, pieces: Vec<String>, degraded: Option<bool>| {
        let start = chunks
            .iter()
            .filter(|c: &&ContentChunk| c.content_type == content_type)
            .count();
        for (offset, body) in pieces.into_iter().enumerate() {
            let degraded = degraded.unwrap_or_else(|| has_sentinel(&body));
            chunks.push(ContentChunk {
                document_id: document_id.to_string(),
                chunk_index: start + offset,
                content_type,
                body,
                degraded,
            });
        }
    };

    for block in &blocks {
        push(ContentType::Combined, chunker.chunk(block), None);
    }
    push(ContentType::Text, chunker.chunk(&raw_text(sections)), Some(false));
    for (_, analysis) in descriptions {
        push(
            ContentType::ImageDescription,
            chunker.chunk(&analysis.text),
            Some(analysis.degraded),
        );
    }
    for (_, text) in image_text {
        push(ContentType::Ocr, chunker.chunk(text), Some(false));
    }
    if let Some(transcript) = transcript {
        push(
            ContentType::Transcript,
            chunker.chunk(&transcript.text),
            Some(transcript.degraded),
        );
    }

    debug!("Built {} chunks for {}", chunks.len(), document_id);
    chunks
}

/// Images whose analysis produced a real, non-empty description
pub fn usable_descriptions(descriptions: &[(Anchor, Analysis)]) -> usize {
    descriptions
        .iter()
        .filter(|(_, analysis)| !analysis.degraded && !analysis.text.trim().is_empty())
        .count()
}

fn has_sentinel(body: &str) -> bool {
    body.contains(IMAGE_SENTINEL) || body.contains(AUDIO_SENTINEL)
}
