//! Ingestion pipeline for SEC event filings (form 8-K) into a vector index.
//!
//! The pipeline takes year-grouped filing listings from upstream discovery
//! and turns each disclosed item into annotated, embedded chunks:
//!
//! ```text
//! FilingsByYear
//!   └─ per filing: ledger record ─ section fetch (retry) ─ keywords
//!        └─ chunking ─ ContentUnit accumulation
//! ─────────────────────────────────────────────────────────────────
//!   run end: validity filter ─ batch embed ─ single vector upsert
//! ```
//!
//! Module map:
//!
//! - [`config`] — environment-driven settings, read once at startup.
//! - [`errors`] — the [`IngestError`](errors::IngestError) taxonomy.
//! - [`types`] — filing input shapes, identifiers, [`ContentUnit`](types::ContentUnit).
//! - [`item_codes`] — the static 8-K disclosure item code table.
//! - [`fetch`] — retry-wrapped section retrieval.
//! - [`chunker`] / [`keywords`] — deterministic text processing.
//! - [`ledger`] — relational filing records (PostgreSQL or SQLite).
//! - [`embeddings`] — batch embedding seam with an offline mock.
//! - [`stores`] — the vector index (`sqlite-vec`) and the single write path.
//! - [`pipeline`] — the orchestrator tying it all together.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod fetch;
pub mod item_codes;
pub mod keywords;
pub mod ledger;
pub mod pipeline;
pub mod stores;
pub mod types;

pub use config::IngestConfig;
pub use errors::IngestError;
pub use pipeline::IngestPipeline;
pub use types::{FilingEntry, FilingsByYear, IngestReport};
