//! Chroma vector database integration
//!
//! This module talks to Chroma's v2 REST API and provides:
//! - Idempotent database and collection creation
//! - Batched upserts that embed record text before writing
//! - Best-effort nearest-neighbour queries and filtered reads
//!
//! Store failures are logged and reported as `false` or an empty result;
//! only embedding failures propagate as errors.

mod payload;

pub use payload::*;

use crate::config::{resolve_secret, Config, StoreConfig};
use crate::embed::{create_embedder, embed_in_batches, Embedder};
use crate::error::{Error, Result};
use crate::models::{RetrievalResult, VectorRecord};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

/// Chroma store handle bound to one tenant/database and default collection
pub struct ChromaStore {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
    tenant: String,
    database: String,
    collection: String,
    description: String,
    embedder: Box<dyn Embedder>,
    batch_size: usize,
    /// Collection name -> store-assigned id
    collection_ids: RwLock<HashMap<String, String>>,
}

/// Outcome of a single request that did not error at the transport level
enum Reply {
    Ok(reqwest::Response),
    Failed(StatusCode, String),
}

impl ChromaStore {
    /// Connect using config, building the configured embedder
    pub fn connect(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        Self::new(&config.store, embedder, config.embedding.batch_size)
    }

    /// Create a store handle with an explicit embedder
    pub fn new(config: &StoreConfig, embedder: Box<dyn Embedder>, batch_size: usize) -> Result<Self> {
        debug!("Connecting to Chroma at {}", config.url);

        let base_url = Url::parse(&config.url)
            .map_err(|e| Error::Config(format!("Invalid vector store URL: {}", e)))?;
        let auth_token = match config.api_key_env.as_deref().filter(|e| !e.is_empty()) {
            Some(env) => Some(resolve_secret(env)?),
            None => None,
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth_token,
            tenant: config.tenant.clone(),
            database: config.database.clone(),
            collection: config.collection_name.clone(),
            description: config.collection_description.clone(),
            embedder,
            batch_size: batch_size.max(1),
            collection_ids: RwLock::new(HashMap::new()),
        })
    }

    /// Default collection name
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid vector store URL: {}", e)))
    }

    fn database_path(&self, suffix: &str) -> String {
        format!(
            "/api/v2/tenants/{}/databases/{}{}",
            self.tenant, self.database, suffix
        )
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.header("x-chroma-token", token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Reply> {
        let response = self.request(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(Reply::Ok(response))
        } else {
            let body = response.text().await.unwrap_or_default();
            Ok(Reply::Failed(status, body))
        }
    }

    async fn post<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<Reply> {
        let url = self.endpoint(path)?;
        self.send(self.client.post(url).json(body)).await
    }

    async fn read_json<T: DeserializeOwned>(reply: Reply, what: &str) -> Result<T> {
        match reply {
            Reply::Ok(response) => Ok(response.json::<T>().await?),
            Reply::Failed(status, body) => Err(Error::Store(format!(
                "{} failed with status {}: {}",
                what, status, body
            ))),
        }
    }

    /// Check the server is reachable
    pub async fn heartbeat(&self) -> bool {
        let url = match self.endpoint("/api/v2/heartbeat") {
            Ok(url) => url,
            Err(e) => {
                error!("{}", e);
                return false;
            }
        };
        match self.send(self.client.get(url)).await {
            Ok(Reply::Ok(_)) => true,
            Ok(Reply::Failed(status, body)) => {
                warn!("Chroma heartbeat failed with status {}: {}", status, body);
                false
            }
            Err(e) => {
                warn!("Chroma heartbeat failed: {}", e);
                false
            }
        }
    }

    /// Create the configured database; an existing database counts as success
    pub async fn ensure_database(&self) -> bool {
        let path = format!("/api/v2/tenants/{}/databases", self.tenant);
        let body = CreateDatabaseRequest {
            name: &self.database,
        };
        match self.post(&path, &body).await {
            Ok(Reply::Ok(_)) => {
                info!("Created database {}", self.database);
                true
            }
            Ok(Reply::Failed(status, body)) if is_conflict(status, &body) => {
                debug!("Database {} already exists", self.database);
                true
            }
            Ok(Reply::Failed(status, body)) => {
                error!(
                    "Failed to create database {} (status {}): {}",
                    self.database, status, body
                );
                false
            }
            Err(e) => {
                error!("Failed to create database {}: {}", self.database, e);
                false
            }
        }
    }

    /// Create-or-get a collection by name.
    ///
    /// A cached id answers without any request. Otherwise the collection is
    /// looked up, then created with `get_or_create`; a concurrent creator's
    /// conflict is resolved by looking it up again.
    pub async fn ensure_collection(&self, name: &str) -> bool {
        self.collection_id(name).await.is_some()
    }

    async fn collection_id(&self, name: &str) -> Option<String> {
        if let Some(id) = self.collection_ids.read().await.get(name) {
            return Some(id.clone());
        }

        match self.find_collection(name).await {
            Ok(Some(id)) => return Some(self.remember(name, id).await),
            Ok(None) => {}
            Err(e) => {
                error!("Failed to look up collection {}: {}", name, e);
                return None;
            }
        }

        let request = CreateCollectionRequest {
            name,
            metadata: json!({ "description": self.description }),
            get_or_create: true,
        };
        match self.post(&self.database_path("/collections"), &request).await {
            Ok(reply @ Reply::Ok(_)) => {
                match Self::read_json::<CollectionResponse>(reply, "Create collection").await {
                    Ok(created) => {
                        info!("Created collection {} ({})", name, created.id);
                        Some(self.remember(name, created.id).await)
                    }
                    Err(e) => {
                        error!("Unreadable create response for collection {}: {}", name, e);
                        None
                    }
                }
            }
            Ok(Reply::Failed(status, body)) if is_conflict(status, &body) => {
                debug!("Collection {} created concurrently, probing again", name);
                match self.find_collection(name).await {
                    Ok(Some(id)) => Some(self.remember(name, id).await),
                    Ok(None) => {
                        error!("Collection {} reported as existing but not found", name);
                        None
                    }
                    Err(e) => {
                        error!("Failed to look up collection {}: {}", name, e);
                        None
                    }
                }
            }
            Ok(Reply::Failed(status, body)) => {
                error!(
                    "Failed to create collection {} (status {}): {}",
                    name, status, body
                );
                None
            }
            Err(e) => {
                error!("Failed to create collection {}: {}", name, e);
                None
            }
        }
    }

    async fn find_collection(&self, name: &str) -> Result<Option<String>> {
        let url = self.endpoint(&self.database_path(&format!("/collections/{}", name)))?;
        match self.send(self.client.get(url)).await? {
            reply @ Reply::Ok(_) => {
                let found = Self::read_json::<CollectionResponse>(reply, "Get collection").await?;
                debug!("Collection {} exists ({})", name, found.id);
                Ok(Some(found.id))
            }
            Reply::Failed(status, body) => {
                debug!("Collection {} not found (status {}): {}", name, status, body);
                Ok(None)
            }
        }
    }

    async fn remember(&self, name: &str, id: String) -> String {
        self.collection_ids
            .write()
            .await
            .insert(name.to_string(), id.clone());
        id
    }

    /// Embed and write records to the default collection in one batch.
    ///
    /// Embedding failures return `Err` before the store is contacted.
    /// Store failures are logged and return `Ok(false)`.
    pub async fn upsert(&self, records: &[VectorRecord]) -> Result<bool> {
        if records.is_empty() {
            return Ok(true);
        }

        let documents: Vec<String> = records.iter().map(|r| r.document.clone()).collect();
        let embeddings =
            embed_in_batches(self.embedder.as_ref(), documents.clone(), self.batch_size).await?;
        if embeddings.len() != records.len() {
            return Err(Error::Embedding(format!(
                "Generated {} embeddings for {} records",
                embeddings.len(),
                records.len()
            )));
        }

        let Some(collection_id) = self.collection_id(&self.collection).await else {
            return Ok(false);
        };

        let request = UpsertRequest {
            ids: records.iter().map(|r| r.id.clone()).collect(),
            documents,
            embeddings,
            metadatas: records.iter().map(|r| r.metadata.to_map()).collect(),
        };
        let path = self.database_path(&format!("/collections/{}/upsert", collection_id));
        match self.post(&path, &request).await {
            Ok(Reply::Ok(_)) => {
                info!(
                    "Upserted {} records into {}",
                    records.len(),
                    self.collection
                );
                Ok(true)
            }
            Ok(Reply::Failed(status, body)) => {
                error!(
                    "Failed to upsert {} records (status {}): {}",
                    records.len(),
                    status,
                    body
                );
                Ok(false)
            }
            Err(e) => {
                error!("Failed to upsert {} records: {}", records.len(), e);
                Ok(false)
            }
        }
    }

    /// Nearest-neighbour query against the default collection.
    ///
    /// Returns results in store order, or an empty list on any failure.
    pub async fn query(&self, text: &str, limit: usize) -> Vec<RetrievalResult> {
        match self.try_query(text, limit).await {
            Ok(results) => {
                debug!("Query returned {} results", results.len());
                results
            }
            Err(e) => {
                error!("Vector store query failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_query(&self, text: &str, limit: usize) -> Result<Vec<RetrievalResult>> {
        let vectors = embed_in_batches(self.embedder.as_ref(), vec![text.to_string()], 1).await?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))?;

        let collection_id = self
            .collection_id(&self.collection)
            .await
            .ok_or_else(|| Error::Store(format!("Collection {} unavailable", self.collection)))?;

        let request = QueryRequest {
            query_embeddings: vec![query_vector],
            n_results: limit.max(1),
            include: INCLUDE_FIELDS.to_vec(),
        };
        let path = self.database_path(&format!("/collections/{}/query", collection_id));
        let reply = self.post(&path, &request).await?;
        let response = Self::read_json::<QueryResponse>(reply, "Query").await?;
        Ok(response.into_results())
    }

    /// Read records matching a metadata filter, without ranking.
    ///
    /// Returns an empty list on any failure.
    pub async fn get_where(&self, filter: Value, limit: usize, offset: usize) -> Vec<RetrievalResult> {
        match self.try_get_where(filter, limit, offset).await {
            Ok(results) => results,
            Err(e) => {
                error!("Vector store get failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_get_where(
        &self,
        filter: Value,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let collection_id = self
            .collection_id(&self.collection)
            .await
            .ok_or_else(|| Error::Store(format!("Collection {} unavailable", self.collection)))?;

        let request = GetRequest {
            filter: Some(filter),
            limit,
            offset,
            include: GET_INCLUDE_FIELDS.to_vec(),
        };
        let path = self.database_path(&format!("/collections/{}/get", collection_id));
        let reply = self.post(&path, &request).await?;
        let response = Self::read_json::<GetResponse>(reply, "Get").await?;
        Ok(response.into_results())
    }

    /// Number of records in the default collection
    pub async fn count(&self) -> Option<usize> {
        let collection_id = self.collection_id(&self.collection).await?;
        let path = self.database_path(&format!("/collections/{}/count", collection_id));
        let url = self.endpoint(&path).ok()?;
        match self.send(self.client.get(url)).await {
            Ok(reply) => match Self::read_json::<usize>(reply, "Count").await {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Count request failed: {}", e);
                None
            }
        }
    }
}

fn is_conflict(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT || body.to_ascii_lowercase().contains("already exists")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingProvider;
    use crate::models::{ChunkMetadata, ContentType, DocumentAsset, MediaKind, ContentChunk};
    use async_trait::async_trait;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DB: &str = "/api/v2/tenants/default_tenant/databases/default_database";

    struct FixedEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            if self.fail {
                return Err(Error::Embedding("backend down".into()));
            }
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }

        fn dimension(&self) -> Option<usize> {
            Some(3)
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn provider(&self) -> EmbeddingProvider {
            EmbeddingProvider::Local
        }
    }

    fn store(url: &str, fail: bool) -> ChromaStore {
        let config = StoreConfig {
            url: url.to_string(),
            ..StoreConfig::default()
        };
        ChromaStore::new(&config, Box::new(FixedEmbedder { fail }), 16).unwrap()
    }

    fn records(doc: &DocumentAsset, n: usize) -> Vec<VectorRecord> {
        (0..n)
            .map(|i| {
                let chunk = ContentChunk {
                    document_id: doc.document_id.clone(),
                    chunk_index: i,
                    content_type: ContentType::Text,
                    body: format!("body {}", i),
                    degraded: false,
                };
                VectorRecord::from_chunk(doc, &chunk)
            })
            .collect()
    }

    async fn mount_existing_collection(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(format!("{}/collections/study_materials", DB)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "col-1", "name": "study_materials"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_ensure_collection_twice_creates_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/collections/study_materials", DB)))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{}/collections", DB)))
            .and(body_partial_json(json!({
                "name": "study_materials",
                "metadata": {"description": "Study materials collection"}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "col-1", "name": "study_materials"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = store(&server.uri(), false);
        assert!(store.ensure_collection("study_materials").await);
        assert!(store.ensure_collection("study_materials").await);
    }

    #[tokio::test]
    async fn test_existing_collection_skips_create() {
        let server = MockServer::start().await;
        mount_existing_collection(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/collections", DB)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(store(&server.uri(), false).ensure_collection("study_materials").await);
    }

    #[tokio::test]
    async fn test_concurrent_create_conflict_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/collections/study_materials", DB)))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_existing_collection(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/collections", DB)))
            .respond_with(
                ResponseTemplate::new(409).set_body_string("Collection study_materials already exists"),
            )
            .mount(&server)
            .await;

        assert!(store(&server.uri(), false).ensure_collection("study_materials").await);
    }

    #[tokio::test]
    async fn test_create_failure_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        assert!(!store(&server.uri(), false).ensure_collection("study_materials").await);
    }

    #[tokio::test]
    async fn test_ensure_database_conflict_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/tenants/default_tenant/databases"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        assert!(store(&server.uri(), false).ensure_database().await);
    }

    #[tokio::test]
    async fn test_upsert_sends_parallel_arrays() {
        let server = MockServer::start().await;
        mount_existing_collection(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/collections/col-1/upsert", DB)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let doc = DocumentAsset::new("notes.pdf", MediaKind::TextDocument);
        let store = store(&server.uri(), false);
        assert!(store.upsert(&records(&doc, 3)).await.unwrap());

        let requests = server.received_requests().await.unwrap();
        let upsert = requests
            .iter()
            .find(|r| r.url.path().ends_with("/upsert"))
            .unwrap();
        let body: Value = serde_json::from_slice(&upsert.body).unwrap();
        assert_eq!(body["ids"].as_array().unwrap().len(), 3);
        assert_eq!(body["embeddings"].as_array().unwrap().len(), 3);
        assert_eq!(body["metadatas"][0]["document_id"], doc.document_id.as_str());
        assert_eq!(body["ids"][1], format!("{}_text_1", doc.document_id));
    }

    #[tokio::test]
    async fn test_upsert_embedding_failure_never_contacts_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let doc = DocumentAsset::new("notes.pdf", MediaKind::TextDocument);
        let result = store(&server.uri(), true).upsert(&records(&doc, 2)).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[tokio::test]
    async fn test_upsert_store_failure_is_false() {
        let server = MockServer::start().await;
        mount_existing_collection(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{}/collections/col-1/upsert", DB)))
            .respond_with(ResponseTemplate::new(422).set_body_string("dimension mismatch"))
            .mount(&server)
            .await;

        let doc = DocumentAsset::new("notes.pdf", MediaKind::TextDocument);
        let ok = store(&server.uri(), false).upsert(&records(&doc, 1)).await.unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_query_parses_results() {
        let server = MockServer::start().await;
        mount_existing_collection(&server).await;
        let doc = DocumentAsset::new("notes.pdf", MediaKind::TextDocument);
        let chunk = ContentChunk {
            document_id: doc.document_id.clone(),
            chunk_index: 0,
            content_type: ContentType::Text,
            body: "Photosynthesis".to_string(),
            degraded: false,
        };
        let metadata = ChunkMetadata::for_chunk(&doc, &chunk).to_map();
        Mock::given(method("POST"))
            .and(path(format!("{}/collections/col-1/query", DB)))
            .and(body_partial_json(json!({
                "n_results": 5,
                "include": ["documents", "metadatas", "distances"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": [[chunk.record_id()]],
                "documents": [["Photosynthesis"]],
                "metadatas": [[metadata]],
                "distances": [[0.12]]
            })))
            .mount(&server)
            .await;

        let results = store(&server.uri(), false).query("plants", 5).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "Photosynthesis");
        assert_eq!(results[0].content_type(), Some(ContentType::Text));
        assert_eq!(results[0].distance, Some(0.12));
    }

    #[tokio::test]
    async fn test_query_failure_is_empty() {
        let server = MockServer::start().await;
        mount_existing_collection(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(store(&server.uri(), false).query("plants", 5).await.is_empty());
        assert!(store(&server.uri(), true).query("plants", 5).await.is_empty());
    }
}
