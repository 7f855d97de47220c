//! Per-filing item processing.
//!
//! Items of one filing are fetched sequentially — the retrieval service is
//! rate limited and concurrency lives one level up, across filings. A
//! missing item or an exhausted fetch is contained here: it is logged with
//! enough context to reprocess by hand and the loop moves on. Only a vector
//! identifier allocation failure aborts the filing, since without the id no
//! unit of this filing can be correlated to its relational record.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::chunker::TextChunker;
use crate::errors::IngestError;
use crate::fetch::{SectionClient, SectionFormat, SectionOutcome};
use crate::keywords::extract_significant_words;
use crate::ledger::FilingLedger;
use crate::types::{ContentUnit, FilingId, UnitKey, VectorId};

/// Content units produced for one filing, with per-item failure counters.
#[derive(Debug, Default)]
pub struct ItemBatch {
    /// Units in item-submission order, chunk order within each item.
    pub units: Vec<ContentUnit>,
    /// Items the retrieval service reported as missing.
    pub not_found: usize,
    /// Items abandoned after a contained fetch failure.
    pub failed: usize,
}

/// Fans out over one filing's disclosed items.
#[derive(Clone)]
pub struct ItemProcessor {
    sections: Arc<SectionClient>,
    ledger: Arc<dyn FilingLedger>,
    chunker: TextChunker,
    keyword_count: usize,
}

impl ItemProcessor {
    pub fn new(
        sections: Arc<SectionClient>,
        ledger: Arc<dyn FilingLedger>,
        chunker: TextChunker,
        keyword_count: usize,
    ) -> Self {
        Self {
            sections,
            ledger,
            chunker,
            keyword_count,
        }
    }

    /// Process every item label of one filing into annotated content units.
    ///
    /// The filing's shared vector identifier is allocated lazily at the
    /// first item that yields text, so filings whose every item is missing
    /// allocate nothing. Chunk ordinals are filing-scoped and span items,
    /// keeping every [`UnitKey`] unique within the filing.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, items), fields(filing = %filing, items = items.len()))]
    pub async fn process_items(
        &self,
        link: &str,
        txt: &str,
        items: &[&str],
        filing: FilingId,
        ticker: &str,
        doc_type: &str,
        year: i32,
    ) -> Result<ItemBatch, IngestError> {
        let mut batch = ItemBatch::default();
        let mut vector: Option<VectorId> = None;
        let mut ordinal = 0usize;

        for item in items {
            let section = match self
                .sections
                .fetch_section(link, item, SectionFormat::Text)
                .await
            {
                Ok(SectionOutcome::Section(text)) => text,
                Ok(SectionOutcome::NotFound) => {
                    info!(item, link, "item not present in filing, skipping");
                    batch.not_found += 1;
                    continue;
                }
                Err(err) => {
                    warn!(item, link, error = %err, "item fetch failed, skipping");
                    batch.failed += 1;
                    continue;
                }
            };

            // Allocation failure aborts the whole filing; see module docs.
            let vector = match vector {
                Some(id) => id,
                None => {
                    let id = self.ledger.allocate_vector_id(filing).await?;
                    vector = Some(id);
                    id
                }
            };

            let keywords = extract_significant_words(&section, self.keyword_count);
            let chunks = self.chunker.chunk(&section);
            debug!(item, chunks = chunks.len(), "section chunked");

            for body in chunks {
                batch.units.push(ContentUnit {
                    key: UnitKey { vector, ordinal },
                    filing,
                    ticker: ticker.to_string(),
                    doc_type: doc_type.to_string(),
                    item: item.to_string(),
                    year,
                    link: link.to_string(),
                    txt: txt.to_string(),
                    keywords: keywords.clone(),
                    body,
                });
                ordinal += 1;
            }
        }

        info!(
            units = batch.units.len(),
            not_found = batch.not_found,
            failed = batch.failed,
            "filing items processed"
        );
        Ok(batch)
    }
}
