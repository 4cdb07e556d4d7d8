//! Default values for configuration

use std::path::PathBuf;

/// Default Chroma REST URL for local development
pub fn default_store_url() -> String {
    std::env::var("CHROMA_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
}

/// Default Chroma tenant
pub fn default_store_tenant() -> String {
    "default_tenant".to_string()
}

/// Default Chroma database
pub fn default_store_database() -> String {
    "default_database".to_string()
}

/// Default collection name
pub fn default_collection_name() -> String {
    "study_materials".to_string()
}

/// Metadata description attached to newly created collections
pub fn default_collection_description() -> String {
    "Study materials collection".to_string()
}

/// Vector store request timeout
pub fn default_store_timeout() -> u64 {
    30
}

/// Embedding backend URL override (empty means provider default)
pub fn default_embedding_url() -> Option<String> {
    std::env::var("STUDYRAG_EMBEDDING_URL").ok()
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Embedding request timeout
pub fn default_embedding_timeout() -> u64 {
    60
}

/// Health check timeout
pub fn default_embedding_health_timeout() -> u64 {
    5
}

/// Attempts per embedding request, including the first one
pub fn default_embedding_max_attempts() -> usize {
    3
}

/// Base delay between embedding retries
pub fn default_embedding_retry_delay_ms() -> u64 {
    1000
}

/// Delay between per-text requests for backends without native batching
pub fn default_embedding_pacing_ms() -> u64 {
    100
}

/// Max tokens for image descriptions
pub fn default_vision_max_tokens() -> u32 {
    1000
}

/// Vision request timeout
pub fn default_vision_timeout() -> u64 {
    60
}

/// Default speech-to-text API base
pub fn default_transcription_url() -> String {
    "https://api.openai.com".to_string()
}

/// Default speech-to-text model
pub fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

/// Credential variable for speech-to-text
pub fn default_transcription_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Transcription request timeout
pub fn default_transcription_timeout() -> u64 {
    60
}

/// Max tokens for generated answers
pub fn default_generation_max_tokens() -> u32 {
    1500
}

/// Generation request timeout
pub fn default_generation_timeout() -> u64 {
    60
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    1000
}

/// Default number of results for topic queries
pub fn default_retrieval_top_k() -> usize {
    10
}

/// Page size used when fetching all content of a document
pub fn default_retrieval_page_size() -> usize {
    100
}

/// Upper bound on pages fetched for one document
pub fn default_retrieval_max_pages() -> usize {
    50
}

/// Topic used when a caller does not name one
pub fn default_retrieval_topic() -> String {
    "main concepts and key points".to_string()
}

/// Default temp directory for extracted artifacts
pub fn default_ingest_temp_dir() -> PathBuf {
    std::env::temp_dir().join("studyrag")
}

/// Seconds between sampled video frames
pub fn default_frame_interval() -> u64 {
    30
}

/// Concurrent image/audio analysis calls per document
pub fn default_max_concurrent_assets() -> usize {
    4
}

/// Age after which temp artifacts are swept
pub fn default_janitor_max_age() -> u64 {
    3600
}

/// Default: rasterize PDF pages for visual analysis
pub fn default_render_pdf_pages() -> bool {
    true
}

/// Resolution used when rasterizing PDF pages
pub fn default_pdf_render_dpi() -> u32 {
    150
}

/// Default ffmpeg binary
pub fn default_ffmpeg_bin() -> String {
    "ffmpeg".to_string()
}

/// Default pdftoppm binary
pub fn default_pdftoppm_bin() -> String {
    "pdftoppm".to_string()
}

pub fn default_ocr_pages() -> bool {
    true
}

/// Default OCR binary
pub fn default_ocr_bin() -> String {
    "tesseract".to_string()
}

pub fn default_ocr_lang() -> String {
    "eng".to_string()
}
