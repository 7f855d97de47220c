//! Error taxonomy for the ingestion pipeline.
//!
//! Variants map onto the pipeline's failure domains:
//!
//! - [`IngestError::MissingEnv`] / [`IngestError::InvalidEnv`] — startup
//!   configuration problems, surfaced before any work begins.
//! - [`IngestError::UnknownItemCode`] — a filing carried a disclosure item
//!   code absent from the static code table.
//! - [`IngestError::FetchExhausted`] / [`IngestError::FetchStatus`] —
//!   section retrieval failed past the retry budget, or with a status the
//!   client never retries. A missing section (404) is *not* an error; see
//!   [`crate::fetch::SectionOutcome`].
//! - [`IngestError::Ledger`] — relational insert/allocation failures.
//! - [`IngestError::Storage`] / [`IngestError::Embedding`] — the final
//!   batched vector write and its embedding step; fatal to the run.
//! - [`IngestError::Chunking`] — invalid chunker parameters.
//! - [`IngestError::TaskJoin`] — a spawned per-filing task was cancelled or
//!   panicked; contained to that filing by the orchestrator.

use thiserror::Error;

/// Errors produced by the filing ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A required environment variable was not set.
    #[error("missing required environment variable {key}")]
    MissingEnv {
        /// Environment variable key
        key: String,
    },

    /// An environment variable was present but unparseable.
    #[error("invalid value for environment variable {key}: {message}")]
    InvalidEnv {
        /// Environment variable key
        key: String,
        /// Description of the parse problem
        message: String,
    },

    /// A numeric disclosure item code had no entry in the code table.
    #[error("unknown disclosure item code '{code}'")]
    UnknownItemCode {
        /// The unmapped numeric code, e.g. `"4.03"`
        code: String,
    },

    /// Section retrieval gave up after exhausting the retry budget.
    #[error("section fetch for item {item} at {link} failed after {attempts} attempts: {message}")]
    FetchExhausted {
        /// Dash-form item label
        item: String,
        /// Filing URL passed to the retrieval service
        link: String,
        /// Attempts made before giving up
        attempts: u32,
        /// Last transport or status error observed
        message: String,
    },

    /// The retrieval service answered with a status that is never retried.
    #[error("section service returned status {status} for item {item} at {link}")]
    FetchStatus {
        /// HTTP status code
        status: u16,
        /// Dash-form item label
        item: String,
        /// Filing URL passed to the retrieval service
        link: String,
    },

    /// Relational ledger failure (filing insert or vector id allocation).
    #[error("ledger error: {message}")]
    Ledger {
        /// Backend error description
        message: String,
    },

    /// Vector store failure; fatal when raised by the final batched write.
    #[error("vector store error: {message}")]
    Storage {
        /// Backend error description
        message: String,
    },

    /// Embedding provider failure while preparing the batched write.
    #[error("embedding provider error: {message}")]
    Embedding {
        /// Provider error description
        message: String,
    },

    /// Chunker parameter validation failure.
    #[error("invalid chunking parameters: {0}")]
    Chunking(String),

    /// A spawned filing task was cancelled or panicked before completing.
    #[error("filing task failed to complete: {0}")]
    TaskJoin(String),
}

impl IngestError {
    /// Wrap a backend error into the ledger variant.
    pub fn ledger(err: impl std::fmt::Display) -> Self {
        IngestError::Ledger {
            message: err.to_string(),
        }
    }

    /// Wrap a backend error into the storage variant.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        IngestError::Storage {
            message: err.to_string(),
        }
    }

    /// Wrap a provider error into the embedding variant.
    pub fn embedding(err: impl std::fmt::Display) -> Self {
        IngestError::Embedding {
            message: err.to_string(),
        }
    }
}
