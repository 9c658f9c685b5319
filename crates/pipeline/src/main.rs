mod config;
mod runner;

use anyhow::{Context, Result};
use config::{Config, ExtractionMode};
use extract::{Extractor, MockExtractor, OllamaClient, OllamaExtractor};
use ontology::{OntologyIndex, load_concept_table};
use runner::Runner;
use std::sync::Arc;
use store::{GraphWriter, RetryPolicy};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let run_id = Uuid::new_v4();
    tracing::info!(
        run_id = %run_id,
        docs_dir = %config.docs_dir.display(),
        mode = ?config.mode,
        "starting ingestion run"
    );

    // A malformed concept table aborts here; a missing one degrades to an
    // empty index and the run proceeds without ontology matches.
    let concept_rows = load_concept_table(&config.ontology_csv)?;
    let index = Arc::new(OntologyIndex::from_rows(&concept_rows, config.fuzzy.clone()));

    let retry = RetryPolicy::new(
        config.retry.max_retries,
        config.retry.initial_backoff_ms,
        config.retry.max_backoff_ms,
    );
    let writer = Arc::new(
        GraphWriter::connect(&config.store, retry)
            .await
            .context("failed to connect to graph store")?,
    );
    writer
        .verify_connectivity()
        .await
        .context("store connectivity check failed")?;
    writer
        .init_schema()
        .await
        .context("failed to create store indexes")?;
    writer
        .ingest_ontology(&concept_rows)
        .await
        .context("failed to persist ontology")?;
    tracing::info!(concepts = concept_rows.len(), "ontology persisted");

    let mut chunks = ingest::ingest_directory(&config.docs_dir, config.chunking.clone())
        .await
        .context("failed to read documents")?;
    if let Some(limit) = config.max_chunks {
        chunks.truncate(limit);
    }
    tracing::info!(chunks = chunks.len(), "documents chunked");

    // Backend selection happens once, up front; the rest of the run only
    // sees the contract.
    let extractor: Option<Arc<dyn Extractor>> = match config.mode {
        ExtractionMode::Llm => Some(Arc::new(OllamaExtractor::new(OllamaClient::new(
            config.llm.base_url.clone(),
            config.llm.model.clone(),
        )))),
        ExtractionMode::Mock => Some(Arc::new(MockExtractor::new())),
        ExtractionMode::SkipLlm => None,
    };

    let runner = Runner::new(writer.clone(), extractor, index, &config);
    let summary = runner.run(run_id, chunks).await?;

    let stats = writer.stats().await.context("failed to read graph stats")?;
    tracing::info!(
        run_id = %run_id,
        chunks_processed = summary.chunks_processed,
        chunks_skipped = summary.chunks_skipped,
        entities_written = summary.entities_written,
        relations_written = summary.relations_written,
        relations_skipped = summary.relations_skipped,
        graph_chunks = stats.chunk_count,
        graph_entities = stats.entity_count,
        graph_relations = stats.relation_count,
        "run complete"
    );

    Ok(())
}
