//! Request and response bodies for the Chroma v2 REST API

use crate::models::RetrievalResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields requested from query and get calls
pub const INCLUDE_FIELDS: [&str; 3] = ["documents", "metadatas", "distances"];

/// Fields requested from get calls (distances only exist for queries)
pub const GET_INCLUDE_FIELDS: [&str; 2] = ["documents", "metadatas"];

#[derive(Debug, Serialize)]
pub struct CreateDatabaseRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateCollectionRequest<'a> {
    pub name: &'a str,
    pub metadata: Value,
    pub get_or_create: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionResponse {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Body shared by `/add` and `/upsert`
#[derive(Debug, Serialize)]
pub struct UpsertRequest {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadatas: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct QueryRequest {
    pub query_embeddings: Vec<Vec<f32>>,
    pub n_results: usize,
    pub include: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct GetRequest {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub limit: usize,
    pub offset: usize,
    pub include: Vec<&'static str>,
}

/// Query results come back as one parallel array per query embedding
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub ids: Vec<Vec<String>>,
    #[serde(default)]
    pub documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    pub distances: Option<Vec<Vec<Option<f32>>>>,
}

impl QueryResponse {
    /// Results for the first query embedding, in store order
    pub fn into_results(self) -> Vec<RetrievalResult> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let documents = first_row(self.documents);
        let metadatas = first_row(self.metadatas);
        let distances = first_row(self.distances);

        zip_results(ids, documents, metadatas, |i| {
            distances.get(i).copied().flatten()
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GetResponse {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Option<Map<String, Value>>>>,
}

impl GetResponse {
    pub fn into_results(self) -> Vec<RetrievalResult> {
        zip_results(
            self.ids,
            self.documents.unwrap_or_default(),
            self.metadatas.unwrap_or_default(),
            |_| None,
        )
    }
}

fn first_row<T>(rows: Option<Vec<Vec<T>>>) -> Vec<T> {
    rows.and_then(|r| r.into_iter().next()).unwrap_or_default()
}

fn zip_results(
    ids: Vec<String>,
    documents: Vec<Option<String>>,
    metadatas: Vec<Option<Map<String, Value>>>,
    distance: impl Fn(usize) -> Option<f32>,
) -> Vec<RetrievalResult> {
    let mut documents = documents.into_iter();
    let mut metadatas = metadatas.into_iter();
    ids.into_iter()
        .enumerate()
        .map(|(i, id)| RetrievalResult {
            id,
            content: documents.next().flatten().unwrap_or_default(),
            metadata: metadatas.next().flatten().unwrap_or_default(),
            distance: distance(i),
        })
        .collect()
}
