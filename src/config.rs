//! Environment-driven configuration.
//!
//! All settings come from the process environment; [`IngestConfig::from_env`]
//! reads them once at startup and fails fast with [`IngestError::MissingEnv`]
//! or [`IngestError::InvalidEnv`] before any network or database work starts.
//! Tests build configs through [`IngestConfig::from_lookup`] with a closure
//! instead of touching the real environment.

use std::time::Duration;

use url::Url;

use crate::chunker;
use crate::errors::IngestError;
use crate::fetch::RetryPolicy;
use crate::keywords::DEFAULT_KEYWORD_COUNT;

const DEFAULT_SECTION_API_URL: &str = "https://api.sec-api.io/extractor";
const DEFAULT_EMBEDDING_API_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_VECTOR_STORE_PATH: &str = "vectors.db";

/// Runtime configuration for one ingestion process.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Section-extraction endpoint (`SECTION_API_URL`).
    pub section_api_url: Url,
    /// API token for the extraction service (`SECTION_API_KEY`).
    pub section_api_key: String,
    /// Relational ledger connection string (`DATABASE_URL`).
    pub database_url: String,
    /// SQLite vector index path (`VECTOR_STORE_PATH`).
    pub vector_store_path: String,
    /// Base URL of the embedding service (`EMBEDDING_API_URL`).
    pub embedding_api_url: Url,
    /// API key for the embedding service (`OPENAI_API_KEY`).
    pub embedding_api_key: String,
    /// Embedding model name (`EMBEDDING_MODEL`).
    pub embedding_model: String,
    /// Section fetch retry budget and backoff.
    pub retry: RetryPolicy,
    /// Chunk window size in characters (`CHUNK_MAX_CHARS`).
    pub chunk_max_chars: usize,
    /// Chunk overlap in characters (`CHUNK_OVERLAP`).
    pub chunk_overlap: usize,
    /// Significant words extracted per section (`KEYWORD_COUNT`).
    pub keyword_count: usize,
}

impl IngestConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, IngestError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` instead of the real environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IngestError> {
        let section_api_url = parse_url(
            "SECTION_API_URL",
            lookup("SECTION_API_URL").unwrap_or_else(|| DEFAULT_SECTION_API_URL.into()),
        )?;
        let embedding_api_url = parse_url(
            "EMBEDDING_API_URL",
            lookup("EMBEDDING_API_URL").unwrap_or_else(|| DEFAULT_EMBEDDING_API_URL.into()),
        )?;

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(
                "RETRY_MAX_ATTEMPTS",
                &lookup,
                defaults.max_attempts,
            )?,
            base_delay: Duration::from_millis(parse_or(
                "RETRY_BASE_DELAY_MS",
                &lookup,
                defaults.base_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(parse_or(
                "RETRY_MAX_DELAY_MS",
                &lookup,
                defaults.max_delay.as_millis() as u64,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                &lookup,
                defaults.request_timeout.as_secs(),
            )?),
        };
        if retry.max_attempts == 0 {
            return Err(IngestError::InvalidEnv {
                key: "RETRY_MAX_ATTEMPTS".into(),
                message: "must be at least 1".into(),
            });
        }

        let chunk_max_chars = parse_or("CHUNK_MAX_CHARS", &lookup, chunker::DEFAULT_MAX_CHARS)?;
        let chunk_overlap = parse_or("CHUNK_OVERLAP", &lookup, chunker::DEFAULT_OVERLAP)?;

        Ok(Self {
            section_api_url,
            section_api_key: require("SECTION_API_KEY", &lookup)?,
            database_url: require("DATABASE_URL", &lookup)?,
            vector_store_path: lookup("VECTOR_STORE_PATH")
                .unwrap_or_else(|| DEFAULT_VECTOR_STORE_PATH.into()),
            embedding_api_url,
            embedding_api_key: require("OPENAI_API_KEY", &lookup)?,
            embedding_model: lookup("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            retry,
            chunk_max_chars,
            chunk_overlap,
            keyword_count: parse_or("KEYWORD_COUNT", &lookup, DEFAULT_KEYWORD_COUNT)?,
        })
    }
}

fn require(key: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<String, IngestError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(IngestError::MissingEnv { key: key.into() }),
    }
}

fn parse_url(key: &str, raw: String) -> Result<Url, IngestError> {
    Url::parse(&raw).map_err(|err| IngestError::InvalidEnv {
        key: key.into(),
        message: err.to_string(),
    })
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, IngestError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|err: T::Err| IngestError::InvalidEnv {
            key: key.into(),
            message: err.to_string(),
        }),
        None => Ok(default),
    }
}
