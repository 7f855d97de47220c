//! Command-line entry point.
//!
//! Usage: `ingest <TICKER> <COMPANY_ID> <FILINGS_JSON>`
//!
//! `FILINGS_JSON` is the year-grouped filing listing produced by upstream
//! discovery (`{"2023": {"8-K": [{...}]}}`). All service endpoints, keys,
//! and tuning knobs come from the environment; see [`IngestConfig`].

use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use edgar_ingest::chunker::TextChunker;
use edgar_ingest::embeddings::OpenAiEmbeddingProvider;
use edgar_ingest::fetch::SectionClient;
use edgar_ingest::ledger::PostgresLedger;
use edgar_ingest::stores::SqliteUnitStore;
use edgar_ingest::{FilingsByYear, IngestConfig, IngestPipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine; the environment may be set directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (ticker, company_id, filings_path) = match (args.next(), args.next(), args.next()) {
        (Some(t), Some(c), Some(p)) => (t, c.parse::<i64>()?, p),
        _ => {
            eprintln!("usage: ingest <TICKER> <COMPANY_ID> <FILINGS_JSON>");
            std::process::exit(2);
        }
    };

    let config = IngestConfig::from_env()?;

    let raw = std::fs::read_to_string(&filings_path)?;
    let filings: FilingsByYear = serde_json::from_str(&raw)?;

    let ledger = Arc::new(PostgresLedger::connect(&config.database_url).await?);
    let sections = Arc::new(SectionClient::new(
        config.section_api_url.clone(),
        config.section_api_key.clone(),
        config.retry.clone(),
    )?);
    let embedder = Arc::new(OpenAiEmbeddingProvider::new(
        &config.embedding_api_url,
        config.embedding_api_key.clone(),
        config.embedding_model.clone(),
    )?);
    let store = Arc::new(SqliteUnitStore::open(&config.vector_store_path).await?);
    let chunker = TextChunker::new(config.chunk_max_chars, config.chunk_overlap)?;

    let pipeline = IngestPipeline::new(
        ledger,
        sections,
        embedder,
        store,
        chunker,
        config.keyword_count,
    );

    let report = pipeline
        .ingest_filings(&filings, &ticker, company_id)
        .await?;

    println!(
        "filings: {} seen, {} ingested, {} skipped",
        report.filings_seen, report.filings_ingested, report.filings_skipped
    );
    println!(
        "items: {} not found, {} failed",
        report.items_not_found, report.items_failed
    );
    println!(
        "units: {} indexed, {} dropped",
        report.units_indexed, report.units_dropped
    );
    Ok(())
}
