//! Core data types shared across the pipeline.
//!
//! - [`FilingsByYear`] — the input shape handed to the orchestrator by the
//!   upstream filing-discovery step.
//! - [`FilingId`] / [`VectorId`] — identifiers minted by the relational
//!   ledger, joining filings to their indexed content.
//! - [`UnitKey`] — compound vector-store key (shared filing vector id plus a
//!   filing-scoped chunk ordinal), so every chunk row is unique while all
//!   chunks of one filing remain correlated through a single vector id.
//! - [`ContentUnit`] — one chunk of item text plus metadata, the atomic unit
//!   written to the vector store.
//! - [`IngestReport`] — counters summarising one ingestion run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed event-filing form type this pipeline ingests.
pub const EVENT_FILING_TYPE: &str = "8-K";

/// One filing as reported by upstream discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingEntry {
    /// Rendered filing page, recorded on the relational ledger.
    pub html: String,
    /// Canonical document URL, used for section extraction and unit metadata.
    pub link: String,
    /// Plain-text rendition URL, carried as unit metadata.
    pub txt: String,
    /// Disclosure month (1-12).
    pub month: u8,
    /// Numeric disclosure item codes, e.g. `["1.01", "9.01"]`.
    pub item_numbers: Vec<String>,
}

/// Filings grouped by year and form type, in upstream submission order.
pub type FilingsByYear = BTreeMap<i32, BTreeMap<String, Vec<FilingEntry>>>;

/// Ledger-assigned identifier of one [`FilingEntry`]'s relational record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilingId(pub i64);

impl fmt::Display for FilingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger-assigned identifier correlating one filing's relational record
/// with its vector-store rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorId(pub i64);

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compound vector-store key: the filing's shared vector id plus a
/// filing-scoped chunk ordinal spanning all items of that filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    /// Vector id shared by every chunk of the owning filing.
    pub vector: VectorId,
    /// Zero-based position of this chunk within the filing.
    pub ordinal: usize,
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}-{}", self.vector, self.ordinal)
    }
}

/// One chunk of disclosure item text, annotated and ready for indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Vector-store key for this chunk.
    pub key: UnitKey,
    /// Owning filing's relational record.
    pub filing: FilingId,
    /// Ticker symbol of the disclosing company.
    pub ticker: String,
    /// Form type, always [`EVENT_FILING_TYPE`] for this pipeline.
    pub doc_type: String,
    /// Dash-form disclosure item label, e.g. `"1-1"`.
    pub item: String,
    /// Filing year.
    pub year: i32,
    /// Canonical filing URL the section was extracted from.
    pub link: String,
    /// Plain-text rendition URL of the full filing.
    pub txt: String,
    /// Significant words extracted from the full section text.
    pub keywords: Vec<String>,
    /// The chunk payload to be embedded and indexed.
    pub body: String,
}

impl ContentUnit {
    /// Whether this unit may be written to the vector store.
    ///
    /// Units with a blank payload or without the metadata needed to trace
    /// them back to a filing must never reach the index.
    pub fn is_indexable(&self) -> bool {
        !self.body.trim().is_empty() && !self.item.is_empty() && !self.link.is_empty()
    }

    /// Metadata object stored alongside the chunk payload.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.filing.0,
            "ticker": self.ticker,
            "type": self.doc_type,
            "item": self.item,
            "year": self.year,
            "link": self.link,
            "txt": self.txt,
            "keywords": self.keywords,
            "vector_id": self.key.vector.0,
        })
    }
}

/// Summary of one [`ingest_filings`](crate::pipeline::IngestPipeline::ingest_filings) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Event filings found in the input.
    pub filings_seen: usize,
    /// Filings whose record was inserted and items processed.
    pub filings_ingested: usize,
    /// Filings skipped after a contained failure (insert, translation,
    /// allocation, or task join).
    pub filings_skipped: usize,
    /// Items the retrieval service reported as missing.
    pub items_not_found: usize,
    /// Items abandoned after retry exhaustion or a non-retriable error.
    pub items_failed: usize,
    /// Units written to the vector store.
    pub units_indexed: usize,
    /// Units dropped by the validity filter before the write.
    pub units_dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(body: &str) -> ContentUnit {
        ContentUnit {
            key: UnitKey {
                vector: VectorId(7),
                ordinal: 0,
            },
            filing: FilingId(42),
            ticker: "ACME".into(),
            doc_type: EVENT_FILING_TYPE.into(),
            item: "1-1".into(),
            year: 2023,
            link: "https://example.com/f".into(),
            txt: "https://example.com/f.txt".into(),
            keywords: vec!["agreement".into()],
            body: body.into(),
        }
    }

    #[test]
    fn blank_payloads_are_not_indexable() {
        assert!(unit("Material agreement signed").is_indexable());
        assert!(!unit("").is_indexable());
        assert!(!unit("   \n\t ").is_indexable());
    }

    #[test]
    fn missing_trace_metadata_is_not_indexable() {
        let mut u = unit("body");
        u.item.clear();
        assert!(!u.is_indexable());

        let mut u = unit("body");
        u.link.clear();
        assert!(!u.is_indexable());
    }

    #[test]
    fn unit_keys_render_stably() {
        let key = UnitKey {
            vector: VectorId(12),
            ordinal: 3,
        };
        assert_eq!(key.to_string(), "v12-3");
    }

    #[test]
    fn filing_entry_deserializes_upstream_payload() {
        let raw = serde_json::json!({
            "html": "https://example.com/doc.htm",
            "link": "https://example.com/doc",
            "txt": "https://example.com/doc.txt",
            "month": 4,
            "itemNumbers": ["1.01", "9.01"]
        });
        let entry: FilingEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.month, 4);
        assert_eq!(entry.item_numbers, vec!["1.01", "9.01"]);
    }
}
