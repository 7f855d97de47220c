//! Run-level orchestration over a company's event filings.
//!
//! One [`IngestPipeline::ingest_filings`] call walks the year-grouped input,
//! records each event filing on the relational ledger, processes one year's
//! filings concurrently, then performs a single batched vector write at the
//! end of the run. Concurrency is bounded to a year: every filing of a year
//! settles before the next year is touched, which caps in-flight load on the
//! rate-limited retrieval service. Per-filing failures (a ledger insert, an
//! unmapped item code, an allocation error, a panicked task) are contained:
//! the filing is counted as skipped and the run continues. Only the final
//! embed-and-write step is fatal.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::chunker::TextChunker;
use crate::embeddings::EmbeddingProvider;
use crate::errors::IngestError;
use crate::fetch::SectionClient;
use crate::item_codes;
use crate::ledger::{FilingLedger, NewFilingRecord};
use crate::pipeline::items::{ItemBatch, ItemProcessor};
use crate::stores::{self, VectorStore};
use crate::types::{ContentUnit, FilingEntry, FilingsByYear, IngestReport, EVENT_FILING_TYPE};

/// The full ingestion pipeline, wired once and reused across runs.
pub struct IngestPipeline {
    ledger: Arc<dyn FilingLedger>,
    sections: Arc<SectionClient>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: TextChunker,
    keyword_count: usize,
}

impl IngestPipeline {
    pub fn new(
        ledger: Arc<dyn FilingLedger>,
        sections: Arc<SectionClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        chunker: TextChunker,
        keyword_count: usize,
    ) -> Self {
        Self {
            ledger,
            sections,
            embedder,
            store,
            chunker,
            keyword_count,
        }
    }

    /// Ingest every event filing in `filings` for one company.
    ///
    /// Filings within a year are spawned concurrently and joined in
    /// submission order before the next year begins, so the resulting unit
    /// sequence is deterministic for a fixed input. All surviving units go
    /// to the vector store in one batch after every year has settled.
    #[instrument(skip(self, filings))]
    pub async fn ingest_filings(
        &self,
        filings: &FilingsByYear,
        ticker: &str,
        company_id: i64,
    ) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();
        let mut units: Vec<ContentUnit> = Vec::new();

        for (&year, by_type) in filings {
            let Some(entries) = by_type.get(EVENT_FILING_TYPE) else {
                continue;
            };
            report.filings_seen += entries.len();

            let handles: Vec<JoinHandle<Result<ItemBatch, IngestError>>> = entries
                .iter()
                .map(|entry| self.spawn_filing(entry.clone(), ticker, company_id, year))
                .collect();

            // The year's filings all settle here before the next year spawns.
            for handle in handles {
                match handle.await {
                    Ok(Ok(batch)) => {
                        report.filings_ingested += 1;
                        report.items_not_found += batch.not_found;
                        report.items_failed += batch.failed;
                        units.extend(batch.units);
                    }
                    Ok(Err(err)) => {
                        warn!(year, error = %err, "filing skipped");
                        report.filings_skipped += 1;
                    }
                    Err(join_err) => {
                        warn!(year, error = %join_err, "filing task did not complete");
                        report.filings_skipped += 1;
                    }
                }
            }
        }

        let (written, dropped) =
            stores::upsert_documents(units, self.embedder.as_ref(), self.store.as_ref()).await?;
        report.units_indexed = written;
        report.units_dropped = dropped;

        info!(
            filings_seen = report.filings_seen,
            filings_ingested = report.filings_ingested,
            filings_skipped = report.filings_skipped,
            units_indexed = report.units_indexed,
            "ingestion run complete"
        );
        Ok(report)
    }

    fn spawn_filing(
        &self,
        entry: FilingEntry,
        ticker: &str,
        company_id: i64,
        year: i32,
    ) -> JoinHandle<Result<ItemBatch, IngestError>> {
        let ledger = Arc::clone(&self.ledger);
        let processor = ItemProcessor::new(
            Arc::clone(&self.sections),
            Arc::clone(&self.ledger),
            self.chunker.clone(),
            self.keyword_count,
        );
        let ticker = ticker.to_string();

        tokio::spawn(async move {
            // The record is cut first; a filing that later fails code
            // translation or item processing still leaves its ledger row.
            let filing = ledger
                .insert_filing(NewFilingRecord {
                    company_id,
                    doc_type: EVENT_FILING_TYPE,
                    year,
                    link: entry.html.as_str(),
                    month: entry.month,
                })
                .await?;

            let labels = item_codes::labels_for(&entry.item_numbers)?;

            processor
                .process_items(
                    &entry.link,
                    &entry.txt,
                    &labels,
                    filing,
                    &ticker,
                    EVENT_FILING_TYPE,
                    year,
                )
                .await
        })
    }
}
