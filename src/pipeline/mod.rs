//! Ingestion pipeline: item processing and the per-run orchestrator.

pub mod items;
pub mod orchestrator;

pub use items::{ItemBatch, ItemProcessor};
pub use orchestrator::IngestPipeline;
