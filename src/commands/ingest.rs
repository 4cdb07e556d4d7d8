//! Ingest command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::{requires_transcription, requires_vision, IngestOptions, IngestReport, Ingestor};
use crate::janitor::sweep;
use crate::media::{create_analyzer, create_transcriber};
use crate::models::MediaKind;
use crate::store::ChromaStore;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Ingest one study file, building only the analysis services it needs
pub async fn cmd_ingest(
    config: &Config,
    store: &ChromaStore,
    file: &Path,
    options: IngestOptions,
    show_progress: bool,
) -> Result<IngestReport> {
    let kind = match options.kind {
        Some(kind) => kind,
        None => MediaKind::from_path(file)?,
    };

    let mut ingestor = Ingestor::new(store, config).with_progress(show_progress);
    if requires_vision(kind, file, &config.ingest) {
        debug!("Using {:?} vision", config.vision.provider);
        ingestor = ingestor.with_analyzer(create_analyzer(&config.vision)?);
    }
    if requires_transcription(kind) {
        ingestor = ingestor.with_transcriber(create_transcriber(&config.transcription)?);
    }

    let report = ingestor
        .ingest(
            file,
            IngestOptions {
                kind: Some(kind),
                ..options
            },
        )
        .await?;

    if !report.stored {
        return Err(Error::Store(format!(
            "Vector store did not accept the {} records of {}",
            report.records, report.document_id
        )));
    }

    let swept = sweep(
        &config.ingest.temp_dir,
        Duration::from_secs(config.ingest.janitor_max_age_secs),
    );
    debug!(
        files = swept.files_removed,
        dirs = swept.dirs_removed,
        "Swept stale work directories"
    );
    Ok(report)
}

pub fn print_ingest_report(report: &IngestReport) {
    println!("\n✓ Ingestion complete");
    println!("  Document ID: {}", report.document_id);
    println!("  File: {} ({})", report.filename, report.media_kind);
    println!("  Records: {}", report.records);
    for (content_type, count) in &report.counts {
        println!("    {}: {}", content_type, count);
    }
    if report.images_analyzed > 0 {
        println!("  Images analyzed: {}", report.images_analyzed);
    }
    if report.has_transcript {
        println!("  Transcript: yes");
    }
    if report.degraded_assets > 0 {
        println!(
            "  ⚠ {} assets could not be analyzed; placeholders were stored",
            report.degraded_assets
        );
    }
}
