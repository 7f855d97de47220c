//! Vector storage for indexed content units.
//!
//! [`VectorStore`] abstracts the index backend; [`sqlite::SqliteUnitStore`]
//! is the shipped implementation (SQLite with `sqlite-vec`). The free
//! function [`upsert_documents`] is the pipeline's single write path: it
//! applies the validity filter, computes embeddings once for the whole
//! batch, and performs one batched upsert. A failure anywhere in that path
//! is fatal to the run — partial-batch retry semantics are deliberately
//! undefined.

pub mod sqlite;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::embeddings::EmbeddingProvider;
use crate::errors::IngestError;
use crate::types::ContentUnit;

pub use sqlite::SqliteUnitStore;

/// A unit as read back from the index.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUnit {
    /// Rendered [`UnitKey`](crate::types::UnitKey), the row's primary key.
    pub id: String,
    /// Owning filing's relational id.
    pub filing: i64,
    /// Dash-form item label.
    pub item: String,
    /// Chunk ordinal within the filing.
    pub ordinal: usize,
    /// Chunk payload.
    pub content: String,
    /// Full metadata object written at index time.
    pub metadata: serde_json::Value,
}

/// Index backend consumed by the pipeline.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Write every `(unit, embedding)` pair in one batch.
    ///
    /// Rows are keyed by [`UnitKey`](crate::types::UnitKey); re-ingesting a
    /// filing with the same keys replaces the previous rows instead of
    /// duplicating them.
    async fn upsert_units(
        &self,
        units: Vec<(ContentUnit, Vec<f32>)>,
    ) -> Result<(), IngestError>;

    /// Total rows in the index.
    async fn count(&self) -> Result<usize, IngestError>;

    /// Read back all units belonging to one filing, in ordinal order.
    async fn units_for_filing(&self, filing: i64) -> Result<Vec<StoredUnit>, IngestError>;

    /// Cosine-similarity search, most similar first.
    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(StoredUnit, f32)>, IngestError>;
}

/// Filter, embed, and batch-write content units into the index.
///
/// Units failing [`ContentUnit::is_indexable`] are dropped before the write.
/// Returns `(written, dropped)` counts. With nothing to write the store is
/// not contacted at all.
#[instrument(skip(units, embedder, store), fields(candidates = units.len()))]
pub async fn upsert_documents(
    units: Vec<ContentUnit>,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> Result<(usize, usize), IngestError> {
    let candidates = units.len();
    let units: Vec<ContentUnit> = units.into_iter().filter(ContentUnit::is_indexable).collect();
    let dropped = candidates - units.len();

    if units.is_empty() {
        info!(dropped, "no indexable units, skipping vector write");
        return Ok((0, dropped));
    }

    let texts: Vec<String> = units.iter().map(|unit| unit.body.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    if embeddings.len() != units.len() {
        return Err(IngestError::Embedding {
            message: format!(
                "{} embeddings returned for {} units",
                embeddings.len(),
                units.len()
            ),
        });
    }

    let written = units.len();
    let batch: Vec<(ContentUnit, Vec<f32>)> = units.into_iter().zip(embeddings).collect();
    store.upsert_units(batch).await?;

    info!(written, dropped, provider = embedder.id(), "vector batch written");
    Ok((written, dropped))
}
