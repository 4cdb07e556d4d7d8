//! Custom error types for studyrag

use serde::Serialize;
use thiserror::Error;

/// Main error type for studyrag operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Generation output could not be parsed: {0}")]
    GenerationParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for studyrag
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error is attributed to when reported to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configuration,
    Extraction,
    Embedding,
    Store,
    Generation,
    Internal,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::Extraction => "extraction",
            Stage::Embedding => "embedding",
            Stage::Store => "store",
            Stage::Generation => "generation",
            Stage::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_)
            | Error::UrlParse(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => Stage::Configuration,
            Error::Extraction(_) => Stage::Extraction,
            Error::Embedding(_) => Stage::Embedding,
            Error::Store(_) => Stage::Store,
            Error::Generation(_) | Error::GenerationParse(_) => Stage::Generation,
            Error::Io(_) | Error::Http(_) | Error::Json(_) | Error::Other(_) => Stage::Internal,
        }
    }

    /// Structured payload safe to show to callers
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            stage: self.stage(),
            message: self.to_string(),
        }
    }
}

/// User-visible error report
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub stage: Stage,
    pub message: String,
}
