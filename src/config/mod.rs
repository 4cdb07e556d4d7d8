//! Configuration management for studyrag
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Credentials are referenced by environment variable name and only resolved
//! when a client is constructed.

mod defaults;

pub use defaults::*;

use crate::embed::BackoffStrategy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vector store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Embedding backend
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Image description backend
    #[serde(default)]
    pub vision: VisionConfig,

    /// Speech-to-text backend
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Generation agent
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Ingestion pipeline configuration
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Chroma connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Chroma base URL
    #[serde(default = "default_store_url")]
    pub url: String,

    #[serde(default = "default_store_tenant")]
    pub tenant: String,

    #[serde(default = "default_store_database")]
    pub database: String,

    /// Collection holding all study material records
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Description stored in collection metadata on create
    #[serde(default = "default_collection_description")]
    pub collection_description: String,

    /// Environment variable holding a Chroma auth token (unset = no auth)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

/// Supported embedding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Locally hosted embedding sidecar (`/health`, `/embed`)
    #[default]
    Local,
    /// Hosted HuggingFace inference API
    Huggingface,
    /// Ollama daemon
    Ollama,
    /// OpenAI embeddings API
    Openai,
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmbeddingProvider::Local => "local",
            EmbeddingProvider::Huggingface => "huggingface",
            EmbeddingProvider::Ollama => "ollama",
            EmbeddingProvider::Openai => "openai",
        };
        f.write_str(name)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Which backend to use
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Backend base URL (defaults per provider)
    #[serde(default = "default_embedding_url")]
    pub url: Option<String>,

    /// Model name/identifier (defaults per provider)
    #[serde(default)]
    pub model: Option<String>,

    /// Environment variable holding the API key (defaults per provider)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Expected embedding dimension, checked on every batch when set
    #[serde(default)]
    pub dimension: Option<usize>,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Health check timeout in seconds
    #[serde(default = "default_embedding_health_timeout")]
    pub health_timeout_secs: u64,

    /// Attempts per request, including the first
    #[serde(default = "default_embedding_max_attempts")]
    pub max_attempts: usize,

    /// Base delay between retries in milliseconds
    #[serde(default = "default_embedding_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// How the retry delay grows between attempts
    #[serde(default)]
    pub backoff: BackoffStrategy,

    /// Delay between per-text requests in milliseconds
    #[serde(default = "default_embedding_pacing_ms")]
    pub pacing_ms: u64,
}

impl EmbeddingConfig {
    /// Effective base URL for the configured provider
    pub fn resolved_url(&self) -> String {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }
        match self.provider {
            EmbeddingProvider::Local => "http://localhost:8001",
            EmbeddingProvider::Huggingface => "https://api-inference.huggingface.co",
            EmbeddingProvider::Ollama => "http://localhost:11434",
            EmbeddingProvider::Openai => "https://api.openai.com",
        }
        .to_string()
    }

    /// Effective model name for the configured provider
    pub fn resolved_model(&self) -> String {
        if let Some(model) = self.model.as_deref().filter(|m| !m.is_empty()) {
            return model.to_string();
        }
        match self.provider {
            EmbeddingProvider::Local => "all-MiniLM-L6-v2",
            EmbeddingProvider::Huggingface => "sentence-transformers/all-MiniLM-L6-v2",
            EmbeddingProvider::Ollama => "nomic-embed-text",
            EmbeddingProvider::Openai => "text-embedding-3-small",
        }
        .to_string()
    }

    /// Credential variable for the configured provider, if it needs one
    pub fn resolved_api_key_env(&self) -> Option<String> {
        if let Some(env) = self.api_key_env.as_deref().filter(|e| !e.is_empty()) {
            return Some(env.to_string());
        }
        match self.provider {
            EmbeddingProvider::Huggingface => Some("HUGGINGFACE_API_KEY".to_string()),
            EmbeddingProvider::Openai => Some("OPENAI_API_KEY".to_string()),
            EmbeddingProvider::Local | EmbeddingProvider::Ollama => None,
        }
    }
}

/// Supported vision backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisionProvider {
    #[default]
    Anthropic,
    /// Any OpenAI-compatible chat completions endpoint
    Openai,
}

/// Image description configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default)]
    pub provider: VisionProvider,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_vision_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_vision_timeout")]
    pub timeout_secs: u64,
}

impl VisionConfig {
    pub fn resolved_url(&self) -> String {
        pick(self.url.as_deref(), || match self.provider {
            VisionProvider::Anthropic => "https://api.anthropic.com",
            VisionProvider::Openai => "https://api.openai.com",
        })
    }

    pub fn resolved_model(&self) -> String {
        pick(self.model.as_deref(), || match self.provider {
            VisionProvider::Anthropic => "claude-3-5-sonnet-latest",
            VisionProvider::Openai => "gpt-4o-mini",
        })
    }

    pub fn resolved_api_key_env(&self) -> String {
        pick(self.api_key_env.as_deref(), || match self.provider {
            VisionProvider::Anthropic => "ANTHROPIC_API_KEY",
            VisionProvider::Openai => "OPENAI_API_KEY",
        })
    }
}

/// Speech-to-text configuration (OpenAI-compatible transcription API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_url")]
    pub url: String,

    #[serde(default = "default_transcription_model")]
    pub model: String,

    #[serde(default = "default_transcription_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,
}

/// Supported generation agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    #[default]
    Anthropic,
    Gemini,
    /// Any OpenAI-compatible chat completions endpoint
    Openai,
}

/// Generation agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_generation_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl GenerationConfig {
    pub fn resolved_url(&self) -> String {
        pick(self.url.as_deref(), || match self.provider {
            GenerationProvider::Anthropic => "https://api.anthropic.com",
            GenerationProvider::Gemini => "https://generativelanguage.googleapis.com",
            GenerationProvider::Openai => "https://api.openai.com",
        })
    }

    pub fn resolved_model(&self) -> String {
        pick(self.model.as_deref(), || match self.provider {
            GenerationProvider::Anthropic => "claude-3-5-sonnet-latest",
            GenerationProvider::Gemini => "gemini-1.5-flash",
            GenerationProvider::Openai => "gpt-4o-mini",
        })
    }

    pub fn resolved_api_key_env(&self) -> String {
        pick(self.api_key_env.as_deref(), || match self.provider {
            GenerationProvider::Anthropic => "ANTHROPIC_API_KEY",
            GenerationProvider::Gemini => "GEMINI_API_KEY",
            GenerationProvider::Openai => "OPENAI_API_KEY",
        })
    }
}

fn pick<'a>(configured: Option<&'a str>, fallback: impl FnOnce() -> &'a str) -> String {
    configured
        .filter(|v| !v.is_empty())
        .unwrap_or_else(fallback)
        .to_string()
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_chars")]
    pub max_chars: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results requested for topic queries
    #[serde(default = "default_retrieval_top_k")]
    pub top_k: usize,

    /// Page size when fetching every record of a document
    #[serde(default = "default_retrieval_page_size")]
    pub page_size: usize,

    /// Maximum pages fetched per document
    #[serde(default = "default_retrieval_max_pages")]
    pub max_pages: usize,

    /// Topic used when none is given
    #[serde(default = "default_retrieval_topic")]
    pub default_topic: String,
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Root for per-run work directories
    #[serde(default = "default_ingest_temp_dir")]
    pub temp_dir: PathBuf,

    /// Seconds between sampled video frames
    #[serde(default = "default_frame_interval")]
    pub frame_interval_secs: u64,

    /// Concurrent asset analysis calls per document
    #[serde(default = "default_max_concurrent_assets")]
    pub max_concurrent_assets: usize,

    /// Temp artifacts older than this are swept
    #[serde(default = "default_janitor_max_age")]
    pub janitor_max_age_secs: u64,

    /// Rasterize PDF pages and describe them
    #[serde(default = "default_render_pdf_pages")]
    pub render_pdf_pages: bool,

    #[serde(default = "default_pdf_render_dpi")]
    pub pdf_render_dpi: u32,

    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,

    #[serde(default = "default_pdftoppm_bin")]
    pub pdftoppm_bin: String,

    /// OCR rendered PDF pages
    #[serde(default = "default_ocr_pages")]
    pub ocr_pages: bool,

    #[serde(default = "default_ocr_bin")]
    pub ocr_bin: String,

    /// Tesseract language code
    #[serde(default = "default_ocr_lang")]
    pub ocr_lang: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for studyrag data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            embedding: EmbeddingConfig::default(),
            vision: VisionConfig::default(),
            transcription: TranscriptionConfig::default(),
            generation: GenerationConfig::default(),
            chunk: ChunkConfig::default(),
            retrieval: RetrievalConfig::default(),
            ingest: IngestConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            tenant: default_store_tenant(),
            database: default_store_database(),
            collection_name: default_collection_name(),
            collection_description: default_collection_description(),
            api_key_env: None,
            timeout_secs: default_store_timeout(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            url: default_embedding_url(),
            model: None,
            api_key_env: None,
            dimension: None,
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_embedding_timeout(),
            health_timeout_secs: default_embedding_health_timeout(),
            max_attempts: default_embedding_max_attempts(),
            retry_delay_ms: default_embedding_retry_delay_ms(),
            backoff: BackoffStrategy::default(),
            pacing_ms: default_embedding_pacing_ms(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            provider: VisionProvider::default(),
            url: None,
            model: None,
            api_key_env: None,
            max_tokens: default_vision_max_tokens(),
            timeout_secs: default_vision_timeout(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            url: default_transcription_url(),
            model: default_transcription_model(),
            api_key_env: default_transcription_api_key_env(),
            timeout_secs: default_transcription_timeout(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            url: None,
            model: None,
            api_key_env: None,
            max_tokens: default_generation_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_retrieval_top_k(),
            page_size: default_retrieval_page_size(),
            max_pages: default_retrieval_max_pages(),
            default_topic: default_retrieval_topic(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_ingest_temp_dir(),
            frame_interval_secs: default_frame_interval(),
            max_concurrent_assets: default_max_concurrent_assets(),
            janitor_max_age_secs: default_janitor_max_age(),
            render_pdf_pages: default_render_pdf_pages(),
            pdf_render_dpi: default_pdf_render_dpi(),
            ffmpeg_bin: default_ffmpeg_bin(),
            pdftoppm_bin: default_pdftoppm_bin(),
            ocr_pages: default_ocr_pages(),
            ocr_bin: default_ocr_bin(),
            ocr_lang: default_ocr_lang(),
        }
    }
}

impl Config {
    /// Get the default base directory for studyrag (~/.studyrag)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".studyrag")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.store.url)
            .map_err(|e| Error::Config(format!("store.url is invalid: {}", e)))?;
        Url::parse(&self.embedding.resolved_url())
            .map_err(|e| Error::Config(format!("embedding.url is invalid: {}", e)))?;

        if self.store.collection_name.trim().is_empty() {
            return Err(Error::Config(
                "store.collection_name must not be empty".to_string(),
            ));
        }

        if self.chunk.max_chars == 0 {
            return Err(Error::Config("chunk.max_chars must be positive".to_string()));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        if self.embedding.max_attempts == 0 {
            return Err(Error::Config(
                "embedding.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.embedding.dimension == Some(0) {
            return Err(Error::Config(
                "embedding.dimension must be positive when set".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 || self.retrieval.page_size == 0 {
            return Err(Error::Config(
                "retrieval.top_k and retrieval.page_size must be positive".to_string(),
            ));
        }

        if self.ingest.frame_interval_secs == 0 {
            return Err(Error::Config(
                "ingest.frame_interval_secs must be positive".to_string(),
            ));
        }

        if self.ingest.max_concurrent_assets == 0 {
            return Err(Error::Config(
                "ingest.max_concurrent_assets must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Read a credential from the named environment variable.
///
/// Called by client constructors only, so a missing key fails before any
/// network traffic.
pub fn resolve_secret(env_name: &str) -> Result<String> {
    match std::env::var(env_name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "Missing credential: environment variable {} is not set",
            env_name
        ))),
    }
}
