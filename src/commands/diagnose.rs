//! Diagnose command: exercise every backend once, stopping at the first failure

use crate::config::Config;
use crate::embed::embed_in_batches;
use crate::error::Result;
use crate::models::{ContentChunk, ContentType, DocumentAsset, MediaKind, VectorRecord};
use crate::store::ChromaStore;
use serde::Serialize;
use tracing::info;

const DIAGNOSTIC_DOCUMENT: &str = "studyrag_diagnostic";

const SAMPLE_TEXTS: [&str; 2] = [
    "Photosynthesis converts light energy into chemical energy stored in glucose.",
    "Mitochondria produce ATP through cellular respiration.",
];

#[derive(Debug, Clone, Serialize)]
pub struct DiagnoseStep {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnoseReport {
    pub store_url: String,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub steps: Vec<DiagnoseStep>,
}

impl DiagnoseReport {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }

    fn record(&mut self, name: &'static str, ok: bool, detail: impl Into<String>) -> bool {
        self.steps.push(DiagnoseStep {
            name,
            ok,
            detail: detail.into(),
        });
        ok
    }
}

pub async fn cmd_diagnose(config: &Config, store: &ChromaStore) -> Result<DiagnoseReport> {
    info!("Running diagnostics");
    let embedder = store.embedder();
    let mut report = DiagnoseReport {
        store_url: config.store.url.clone(),
        embedding_provider: embedder.provider().to_string(),
        embedding_model: embedder.model_name().to_string(),
        steps: Vec::new(),
    };

    let healthy = match embedder.health().await {
        Ok(()) => report.record("embedding health", true, "Embedding service is healthy"),
        Err(e) => report.record("embedding health", false, e.to_string()),
    };
    if !healthy {
        return Ok(report);
    }

    let texts: Vec<String> = SAMPLE_TEXTS.iter().map(|t| t.to_string()).collect();
    let embedded = match embed_in_batches(embedder, texts, config.embedding.batch_size).await {
        Ok(vectors) => report.record(
            "embedding generation",
            true,
            format!(
                "Generated {} embeddings with {} dimensions",
                vectors.len(),
                vectors.first().map_or(0, Vec::len)
            ),
        ),
        Err(e) => report.record("embedding generation", false, e.to_string()),
    };
    if !embedded {
        return Ok(report);
    }

    let database = store.ensure_database().await;
    if !report.record("database", database, format!("Database {}", config.store.database)) {
        return Ok(report);
    }

    let collection = store.ensure_collection(store.collection_name()).await;
    if !report.record(
        "collection",
        collection,
        format!("Collection {} initialized", store.collection_name()),
    ) {
        return Ok(report);
    }

    let stored = match store.upsert(&sample_records()).await {
        Ok(true) => report.record("upsert", true, "Sample records stored"),
        Ok(false) => report.record("upsert", false, "Store rejected the sample records"),
        Err(e) => report.record("upsert", false, e.to_string()),
    };
    if !stored {
        return Ok(report);
    }

    let hits = store.query("What do mitochondria produce?", 2).await;
    report.record(
        "query",
        !hits.is_empty(),
        format!("Query returned {} results", hits.len()),
    );
    Ok(report)
}

fn sample_records() -> Vec<VectorRecord> {
    let asset = DocumentAsset {
        document_id: DIAGNOSTIC_DOCUMENT.to_string(),
        filename: "diagnostic.txt".to_string(),
        media_kind: MediaKind::TextDocument,
        upload_time: chrono::Utc::now(),
    };
    SAMPLE_TEXTS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let chunk = ContentChunk {
                document_id: asset.document_id.clone(),
                chunk_index: i,
                content_type: ContentType::Text,
                body: text.to_string(),
                degraded: false,
            };
            VectorRecord::from_chunk(&asset, &chunk)
        })
        .collect()
}

pub fn print_diagnose(report: &DiagnoseReport) {
    println!("\n🩺 studyrag Diagnostics\n");
    println!("Vector store: {}", report.store_url);
    println!(
        "Embeddings: {} ({})\n",
        report.embedding_provider, report.embedding_model
    );
    for step in &report.steps {
        let mark = if step.ok { "✓" } else { "✗" };
        println!("  {} {}: {}", mark, step.name, step.detail);
    }
    if report.passed() {
        println!("\nAll checks passed");
    } else {
        println!("\nDiagnostics failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_records_are_stable() {
        let ids: Vec<String> = sample_records().into_iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec!["studyrag_diagnostic_text_0", "studyrag_diagnostic_text_1"]
        );
    }
}
