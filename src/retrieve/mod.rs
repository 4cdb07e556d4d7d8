//! Document-scoped retrieval on top of the vector store
//!
//! Every operation is best-effort: store failures surface as empty results,
//! which callers report as "no content found".

use crate::config::RetrievalConfig;
use crate::models::{ContentType, RetrievalResult};
use crate::store::ChromaStore;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Reading speed used for time estimates
const WORDS_PER_MINUTE: usize = 250;

/// Structure and size of one stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub document_id: String,
    pub filename: Option<String>,
    pub total_sections: usize,
    /// Record count per content type
    pub content_breakdown: BTreeMap<String, usize>,
    pub total_words: usize,
    pub estimated_reading_minutes: usize,
}

pub struct Retriever<'a> {
    store: &'a ChromaStore,
    config: RetrievalConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(store: &'a ChromaStore, config: &RetrievalConfig) -> Self {
        Self {
            store,
            config: config.clone(),
        }
    }

    /// Top-K records of `document_id` closest to `topic`, in store order.
    ///
    /// Image descriptions are dropped unless `include_visual`.
    pub async fn relevant_context(
        &self,
        document_id: &str,
        topic: &str,
        include_visual: bool,
    ) -> Vec<RetrievalResult> {
        let hits = self.store.query(topic, self.config.top_k).await;
        let total = hits.len();
        let mut seen = HashSet::new();
        let results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter(|r| r.document_id() == Some(document_id))
            .filter(|r| include_visual || r.content_type() != Some(ContentType::ImageDescription))
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        debug!(
            "Kept {} of {} hits for {} (topic '{}')",
            results.len(),
            total,
            document_id,
            topic
        );
        results
    }

    /// Every record of `document_id`, read page by page.
    ///
    /// Without `include_multimedia` only raw text records are kept.
    pub async fn all_document_content(
        &self,
        document_id: &str,
        include_multimedia: bool,
    ) -> Vec<RetrievalResult> {
        let page_size = self.config.page_size.max(1);
        let mut records = Vec::new();
        let mut exhausted = false;

        for page in 0..self.config.max_pages {
            let batch = self
                .store
                .get_where(json!({ "document_id": document_id }), page_size, page * page_size)
                .await;
            let fetched = batch.len();
            records.extend(batch);
            if fetched < page_size {
                exhausted = true;
                break;
            }
        }
        if !exhausted {
            warn!(
                "Stopped reading {} after {} pages of {}; content may be truncated",
                document_id, self.config.max_pages, page_size
            );
        }

        records.retain(|r| {
            r.document_id() == Some(document_id)
                && (include_multimedia || r.content_type() == Some(ContentType::Text))
        });
        debug!("Read {} records for {}", records.len(), document_id);
        records
    }

    /// Free-text search, optionally restricted to documents and content types
    pub async fn search(
        &self,
        query: &str,
        document_ids: &[String],
        content_types: &[ContentType],
        limit: usize,
    ) -> Vec<RetrievalResult> {
        self.store
            .query(query, limit)
            .await
            .into_iter()
            .filter(|r| {
                document_ids.is_empty()
                    || r.document_id().is_some_and(|id| document_ids.iter().any(|d| d == id))
            })
            .filter(|r| {
                content_types.is_empty()
                    || r.content_type().is_some_and(|t| content_types.contains(&t))
            })
            .collect()
    }

    /// Summarize a document's stored records; `None` when nothing is stored
    pub async fn document_info(&self, document_id: &str) -> Option<DocumentInfo> {
        let records = self.all_document_content(document_id, true).await;
        if records.is_empty() {
            return None;
        }
        Some(summarize(document_id, &records))
    }
}

fn summarize(document_id: &str, records: &[RetrievalResult]) -> DocumentInfo {
    let mut content_breakdown = BTreeMap::new();
    for record in records {
        let kind = record
            .content_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        *content_breakdown.entry(kind).or_insert(0) += 1;
    }

    let total_words: usize = records
        .iter()
        .map(|r| r.content.split_whitespace().count())
        .sum();

    DocumentInfo {
        document_id: document_id.to_string(),
        filename: records
            .iter()
            .find_map(|r| r.metadata.get("filename").and_then(|v| v.as_str()))
            .map(str::to_string),
        total_sections: records.len(),
        content_breakdown,
        total_words,
        estimated_reading_minutes: total_words.div_ceil(WORDS_PER_MINUTE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingProvider, StoreConfig};
    use crate::embed::Embedder;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::Value;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COLLECTION: &str =
        "/api/v2/tenants/default_tenant/databases/default_database/collections/study_materials";
    const RECORDS: &str =
        "/api/v2/tenants/default_tenant/databases/default_database/collections/col-1";

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimension(&self) -> Option<usize> {
            Some(2)
        }

        fn model_name(&self) -> &str {
            "unit"
        }

        fn provider(&self) -> EmbeddingProvider {
            EmbeddingProvider::Local
        }
    }

    async fn store(server: &MockServer) -> ChromaStore {
        Mock::given(method("GET"))
            .and(path(COLLECTION))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "col-1", "name": "study_materials"})),
            )
            .mount(server)
            .await;
        let config = StoreConfig {
            url: server.uri(),
            ..StoreConfig::default()
        };
        ChromaStore::new(&config, Box::new(UnitEmbedder), 8).unwrap()
    }

    fn meta(doc: &str, content_type: &str) -> Value {
        json!({"document_id": doc, "content_type": content_type, "filename": "bio.pdf"})
    }

    fn retrieval(top_k: usize, page_size: usize, max_pages: usize) -> RetrievalConfig {
        RetrievalConfig {
            top_k,
            page_size,
            max_pages,
            default_topic: "main concepts and key points".to_string(),
        }
    }

    #[tokio::test]
    async fn test_relevant_context_filters_document_and_visuals() {
        let server = MockServer::start().await;
        let store = store(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/query", RECORDS)))
            .and(body_partial_json(json!({"n_results": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": [["a_text_0", "a_image_description_0", "b_text_0", "a_combined_0", "a_text_0"]],
                "documents": [["cells", "a diagram", "other doc", "cells and diagram", "cells"]],
                "metadatas": [[
                    meta("a", "text"),
                    meta("a", "image_description"),
                    meta("b", "text"),
                    meta("a", "combined"),
                    meta("a", "text")
                ]],
                "distances": [[0.1, 0.2, 0.3, 0.4, 0.5]]
            })))
            .mount(&server)
            .await;

        let retriever = Retriever::new(&store, &retrieval(10, 100, 50));

        let text_only = retriever.relevant_context("a", "cells", false).await;
        let ids: Vec<&str> = text_only.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a_text_0", "a_combined_0"]);

        let with_visual = retriever.relevant_context("a", "cells", true).await;
        let ids: Vec<&str> = with_visual.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a_text_0", "a_image_description_0", "a_combined_0"]);
    }

    #[tokio::test]
    async fn test_all_document_content_pages_until_short_page() {
        let server = MockServer::start().await;
        let store = store(&server).await;
        // Each page is read twice: once for the content, once for the info
        Mock::given(method("POST"))
            .and(path(format!("{}/get", RECORDS)))
            .and(body_partial_json(json!({"offset": 0, "limit": 2, "where": {"document_id": "a"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": ["a_text_0", "a_transcript_0"],
                "documents": ["one two", "three"],
                "metadatas": [meta("a", "text"), meta("a", "transcript")]
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{}/get", RECORDS)))
            .and(body_partial_json(json!({"offset": 2, "limit": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": ["a_text_1"],
                "documents": ["four five six"],
                "metadatas": [meta("a", "text")]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let retriever = Retriever::new(&store, &retrieval(10, 2, 50));
        let text = retriever.all_document_content("a", false).await;
        assert_eq!(text.len(), 2);
        assert!(text.iter().all(|r| r.content_type() == Some(ContentType::Text)));

        let info = retriever.document_info("a").await.unwrap();
        assert_eq!(info.total_sections, 3);
        assert_eq!(info.content_breakdown["transcript"], 1);
        assert_eq!(info.total_words, 6);
        assert_eq!(info.estimated_reading_minutes, 1);
        assert_eq!(info.filename.as_deref(), Some("bio.pdf"));
    }

    #[tokio::test]
    async fn test_max_pages_truncates() {
        let server = MockServer::start().await;
        let store = store(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/get", RECORDS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": ["a_text_0"],
                "documents": ["again"],
                "metadatas": [meta("a", "text")]
            })))
            .expect(3)
            .mount(&server)
            .await;

        let retriever = Retriever::new(&store, &retrieval(10, 1, 3));
        assert_eq!(retriever.all_document_content("a", true).await.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_document_has_no_info() {
        let server = MockServer::start().await;
        let store = store(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/get", RECORDS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ids": []})))
            .mount(&server)
            .await;

        let retriever = Retriever::new(&store, &retrieval(10, 100, 50));
        assert!(retriever.document_info("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_search_filters() {
        let server = MockServer::start().await;
        let store = store(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/query", RECORDS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": [["a_text_0", "b_transcript_0", "c_text_0"]],
                "documents": [["x", "y", "z"]],
                "metadatas": [[meta("a", "text"), meta("b", "transcript"), meta("c", "text")]],
                "distances": [[0.1, 0.2, 0.3]]
            })))
            .mount(&server)
            .await;

        let retriever = Retriever::new(&store, &retrieval(10, 100, 50));
        assert_eq!(retriever.search("q", &[], &[], 5).await.len(), 3);

        let docs = vec!["a".to_string(), "b".to_string()];
        assert_eq!(retriever.search("q", &docs, &[], 5).await.len(), 2);

        let hits = retriever
            .search("q", &docs, &[ContentType::Transcript], 5)
            .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b_transcript_0");
    }

    #[test]
    fn test_reading_time_rounds_up() {
        let record = RetrievalResult {
            id: "a_text_0".to_string(),
            content: "word ".repeat(251),
            metadata: meta("a", "text").as_object().cloned().unwrap(),
            distance: None,
        };
        let info = summarize("a", &[record]);
        assert_eq!(info.total_words, 251);
        assert_eq!(info.estimated_reading_minutes, 2);
    }
}
