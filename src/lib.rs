//! studyrag: multimodal study-material ingestion and retrieval-augmented
//! generation over a Chroma vector store.

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod extract;
pub mod generate;
pub(crate) mod http;
pub mod ingest;
pub mod janitor;
pub mod media;
pub mod models;
pub mod progress;
pub mod retrieve;
pub mod store;
