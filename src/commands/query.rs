//! Search and document info commands

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{ContentType, RetrievalResult};
use crate::retrieve::{DocumentInfo, Retriever};
use crate::store::ChromaStore;
use serde::Serialize;
use tracing::info;

/// Search options
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub document_ids: Vec<String>,
    pub content_types: Vec<ContentType>,
    pub limit: Option<usize>,
}

/// Search result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutput {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<RetrievalResult>,
}

pub async fn cmd_search(
    config: &Config,
    store: &ChromaStore,
    query: &str,
    options: SearchOptions,
) -> Result<SearchOutput> {
    if query.trim().chars().count() < 3 {
        return Err(Error::Config(
            "Search query must be at least 3 characters".to_string(),
        ));
    }
    info!("Searching: {}", query);

    let limit = options.limit.unwrap_or(config.retrieval.top_k).clamp(1, 50);
    let retriever = Retriever::new(store, &config.retrieval);
    let results = retriever
        .search(query, &options.document_ids, &options.content_types, limit)
        .await;

    Ok(SearchOutput {
        query: query.to_string(),
        total_results: results.len(),
        results,
    })
}

pub async fn cmd_info(config: &Config, store: &ChromaStore, document_id: &str) -> Result<DocumentInfo> {
    Retriever::new(store, &config.retrieval)
        .document_info(document_id)
        .await
        .ok_or_else(|| Error::Store(format!("Document not found: {}", document_id)))
}

pub fn print_search_results(output: &SearchOutput) {
    println!("\n🔍 Query: {}\n", output.query);
    println!("Found {} results:\n", output.total_results);

    for (i, result) in output.results.iter().enumerate() {
        let content_type = result
            .content_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        match result.distance {
            Some(distance) => println!("{}. [{}] distance {:.3}", i + 1, content_type, distance),
            None => println!("{}. [{}]", i + 1, content_type),
        }
        println!("   Document: {}", result.document_id().unwrap_or("?"));
        println!("   {}", preview(&result.content, 200));
        println!();
    }
}

pub fn print_document_info(info: &DocumentInfo) {
    println!("\n📄 Document {}\n", info.document_id);
    if let Some(filename) = &info.filename {
        println!("File: {}", filename);
    }
    println!("Sections: {}", info.total_sections);
    for (content_type, count) in &info.content_breakdown {
        println!("  {}: {}", content_type, count);
    }
    println!("Words: {}", info.total_words);
    println!("Estimated reading time: {} min", info.estimated_reading_minutes);
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}
