use crate::config::Config;
use anyhow::Result;
use dashmap::DashMap;
use extract::{Extractor, Normalizer, slugify};
use ingest::Chunk;
use ontology::OntologyIndex;
use std::sync::Arc;
use store::{GraphSink, StoreError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Progress of a single chunk through the pipeline. `Skipped` is terminal
/// and never blocks other chunks.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkState {
    Chunked,
    ChunkPersisted,
    EntitiesExtracted,
    EntitiesNormalized,
    EntitiesPersisted,
    RelationsExtracted,
    RelationsPersisted,
    Skipped(String),
}

#[derive(Debug)]
pub struct ChunkReport {
    pub chunk_id: String,
    pub state: ChunkState,
    pub entities_written: usize,
    pub relations_written: usize,
    pub relations_skipped: usize,
}

impl ChunkReport {
    fn new(chunk_id: &str) -> Self {
        Self {
            chunk_id: chunk_id.to_string(),
            state: ChunkState::Chunked,
            entities_written: 0,
            relations_written: 0,
            relations_skipped: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub chunks_total: usize,
    pub chunks_processed: usize,
    pub chunks_skipped: usize,
    pub entities_written: usize,
    pub relations_written: usize,
    pub relations_skipped: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &ChunkReport) {
        self.chunks_total += 1;
        match report.state {
            ChunkState::Skipped(_) => self.chunks_skipped += 1,
            _ => self.chunks_processed += 1,
        }
        self.entities_written += report.entities_written;
        self.relations_written += report.relations_written;
        self.relations_skipped += report.relations_skipped;
    }
}

/// Drives chunks through the state machine with a bounded worker pool.
/// Extraction calls are gated separately so collaborator throughput limits
/// are independent of store-write concurrency.
pub struct Runner {
    writer: Arc<dyn GraphSink>,
    extractor: Option<Arc<dyn Extractor>>,
    index: Arc<OntologyIndex>,
    max_concurrent_chunks: usize,
    max_concurrent_llm_calls: usize,
}

impl Runner {
    pub fn new(
        writer: Arc<dyn GraphSink>,
        extractor: Option<Arc<dyn Extractor>>,
        index: Arc<OntologyIndex>,
        config: &Config,
    ) -> Self {
        Self {
            writer,
            extractor,
            index,
            max_concurrent_chunks: config.concurrency.max_concurrent_chunks,
            max_concurrent_llm_calls: config.concurrency.max_concurrent_llm_calls,
        }
    }

    pub async fn run(&self, run_id: Uuid, chunks: Vec<Chunk>) -> Result<RunSummary> {
        // Surface name -> entity id across the whole run. Concurrent inserts
        // for the same name are idempotent because ids are deterministic.
        let name_map: Arc<DashMap<String, String>> = Arc::new(DashMap::new());
        let workers = Arc::new(Semaphore::new(self.max_concurrent_chunks));
        let llm_gate = Arc::new(Semaphore::new(self.max_concurrent_llm_calls));

        let mut tasks = JoinSet::new();
        for chunk in chunks {
            let permit = workers
                .clone()
                .acquire_owned()
                .await
                .expect("worker semaphore closed");
            let writer = self.writer.clone();
            let extractor = self.extractor.clone();
            let index = self.index.clone();
            let name_map = name_map.clone();
            let llm_gate = llm_gate.clone();

            tasks.spawn(async move {
                let _permit = permit;
                process_chunk(writer, extractor, index, name_map, llm_gate, chunk).await
            });
        }

        let mut summary = RunSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(report)) => {
                    tracing::debug!(chunk_id = %report.chunk_id, state = ?report.state, "chunk settled");
                    summary.absorb(&report);
                }
                Ok(Err(e)) => {
                    // A store failure that survived the retry budget; nothing
                    // written so far needs rollback, every write is replayable.
                    tasks.abort_all();
                    return Err(e.into());
                }
                Err(join_err) => {
                    tasks.abort_all();
                    anyhow::bail!("chunk worker panicked: {}", join_err);
                }
            }
        }

        info!(
            run_id = %run_id,
            chunks_total = summary.chunks_total,
            chunks_processed = summary.chunks_processed,
            chunks_skipped = summary.chunks_skipped,
            "all chunks settled"
        );
        Ok(summary)
    }
}

async fn process_chunk(
    writer: Arc<dyn GraphSink>,
    extractor: Option<Arc<dyn Extractor>>,
    index: Arc<OntologyIndex>,
    name_map: Arc<DashMap<String, String>>,
    llm_gate: Arc<Semaphore>,
    chunk: Chunk,
) -> Result<ChunkReport, StoreError> {
    let mut report = ChunkReport::new(&chunk.chunk_id);

    writer.upsert_chunk(&chunk).await?;
    report.state = ChunkState::ChunkPersisted;

    // Skip-LLM mode: chunk nodes only.
    let Some(extractor) = extractor else {
        return Ok(report);
    };

    let entities = {
        let _permit = llm_gate.acquire().await.expect("llm semaphore closed");
        extractor.extract_entities(&chunk.text).await
    };
    let entities = match entities {
        Ok(entities) => entities,
        Err(e) => {
            warn!(chunk_id = %chunk.chunk_id, error = %e, "entity extraction failed, skipping chunk");
            report.state = ChunkState::Skipped(format!("entity extraction: {}", e));
            return Ok(report);
        }
    };
    report.state = ChunkState::EntitiesExtracted;

    let normalized = Normalizer::new(&index).normalize(&entities);
    report.state = ChunkState::EntitiesNormalized;

    for entity in &normalized.entities {
        writer.upsert_entity_and_link(&chunk.chunk_id, entity).await?;
        report.entities_written += 1;
    }
    for (name, id) in &normalized.name_to_id {
        name_map.insert(name.clone(), id.clone());
    }
    report.state = ChunkState::EntitiesPersisted;

    let relations = {
        let _permit = llm_gate.acquire().await.expect("llm semaphore closed");
        extractor.extract_relations(&chunk.text).await
    };
    let relations = match relations {
        Ok(relations) => relations,
        Err(e) => {
            warn!(chunk_id = %chunk.chunk_id, error = %e, "relation extraction failed, skipping chunk");
            report.state = ChunkState::Skipped(format!("relation extraction: {}", e));
            return Ok(report);
        }
    };
    report.state = ChunkState::RelationsExtracted;

    // Relation endpoints resolve through the run-global name map; names
    // never normalized anywhere fall back to the deterministic slug, which
    // keeps relation writes independent of other chunks' progress.
    for relation in &relations {
        let entity1_id = resolve_endpoint(&name_map, &relation.entity1);
        let entity2_id = resolve_endpoint(&name_map, &relation.entity2);

        match writer
            .upsert_relation(
                &entity1_id,
                &entity2_id,
                &relation.relation_type,
                relation.confidence,
            )
            .await
        {
            Ok(()) => report.relations_written += 1,
            Err(StoreError::UnresolvedRelationEndpoint(detail)) => {
                warn!(chunk_id = %chunk.chunk_id, relation = %detail, "skipping relation with missing endpoint");
                report.relations_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    report.state = ChunkState::RelationsPersisted;

    Ok(report)
}

fn resolve_endpoint(name_map: &DashMap<String, String>, name: &str) -> String {
    name_map
        .get(name.trim())
        .map(|entry| entry.value().clone())
        .unwrap_or_else(|| slugify(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConcurrencyConfig, ExtractionMode, LlmConfig, RetryConfig};
    use async_trait::async_trait;
    use extract::{CandidateEntity, CandidateRelation, ExtractError, MockExtractor};
    use ingest::ChunkerConfig;
    use ontology::FuzzyConfig;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use store::StoreSettings;

    fn test_config() -> Config {
        Config {
            store: StoreSettings {
                uri: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password: "unused".to_string(),
                database: None,
            },
            docs_dir: "input".into(),
            ontology_csv: "concepts.csv".into(),
            chunking: ChunkerConfig {
                chunk_size: 800,
                chunk_overlap: 100,
            },
            fuzzy: FuzzyConfig::default(),
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "mistral".to_string(),
            },
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff_ms: 1,
                max_backoff_ms: 2,
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_chunks: 2,
                max_concurrent_llm_calls: 2,
            },
            mode: ExtractionMode::Mock,
            max_chunks: None,
        }
    }

    fn chunk(doc_id: &str, index: usize, text: &str) -> Chunk {
        Chunk {
            doc_id: doc_id.to_string(),
            chunk_id: format!("{}#{}", doc_id, index),
            text: text.to_string(),
            source: "test.txt".to_string(),
            index,
        }
    }

    /// In-memory sink with the writer's endpoint semantics: relations only
    /// merge between entities that were previously upserted.
    #[derive(Default)]
    struct RecordingSink {
        chunks: Mutex<Vec<String>>,
        entities: Mutex<HashSet<String>>,
        relations: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl GraphSink for RecordingSink {
        async fn upsert_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
            self.chunks.lock().unwrap().push(chunk.chunk_id.clone());
            Ok(())
        }

        async fn upsert_entity_and_link(
            &self,
            _chunk_id: &str,
            entity: &extract::CanonicalEntity,
        ) -> Result<(), StoreError> {
            self.entities.lock().unwrap().insert(entity.id.clone());
            Ok(())
        }

        async fn upsert_relation(
            &self,
            entity1_id: &str,
            entity2_id: &str,
            relation_type: &str,
            _confidence: Option<f64>,
        ) -> Result<(), StoreError> {
            let entities = self.entities.lock().unwrap();
            if !entities.contains(entity1_id) || !entities.contains(entity2_id) {
                return Err(StoreError::UnresolvedRelationEndpoint(format!(
                    "{} -[{}]-> {}",
                    entity1_id, relation_type, entity2_id
                )));
            }
            drop(entities);
            self.relations.lock().unwrap().push((
                entity1_id.to_string(),
                entity2_id.to_string(),
                relation_type.to_string(),
            ));
            Ok(())
        }
    }

    /// Delegates to the deterministic extractor but fails on any chunk whose
    /// text contains the trigger word.
    struct FailOnTrigger {
        inner: MockExtractor,
        trigger: &'static str,
    }

    impl FailOnTrigger {
        fn new(trigger: &'static str) -> Self {
            Self {
                inner: MockExtractor::new(),
                trigger,
            }
        }

        fn check(&self, chunk_text: &str) -> Result<(), ExtractError> {
            if chunk_text.contains(self.trigger) {
                return Err(ExtractError::MalformedResponse(
                    "response was not valid JSON".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Extractor for FailOnTrigger {
        async fn extract_entities(
            &self,
            chunk_text: &str,
        ) -> Result<Vec<CandidateEntity>, ExtractError> {
            self.check(chunk_text)?;
            self.inner.extract_entities(chunk_text).await
        }

        async fn extract_relations(
            &self,
            chunk_text: &str,
        ) -> Result<Vec<CandidateRelation>, ExtractError> {
            self.check(chunk_text)?;
            self.inner.extract_relations(chunk_text).await
        }
    }

    #[tokio::test]
    async fn extraction_failure_skips_chunk_without_blocking_others() {
        let sink = Arc::new(RecordingSink::default());
        let index = Arc::new(OntologyIndex::from_rows(&[], FuzzyConfig::default()));
        let extractor: Arc<dyn Extractor> = Arc::new(FailOnTrigger::new("garbled"));
        let runner = Runner::new(sink.clone(), Some(extractor), index, &test_config());

        let chunks = vec![
            chunk("doc", 0, "aspirin treats fever reliably"),
            chunk("doc", 1, "garbled collaborator output here"),
        ];
        let summary = runner.run(Uuid::new_v4(), chunks).await.unwrap();

        assert_eq!(summary.chunks_total, 2);
        assert_eq!(summary.chunks_processed, 1);
        assert_eq!(summary.chunks_skipped, 1);
        assert!(summary.entities_written > 0);
        // Both chunk nodes persist; only the healthy chunk gets entities.
        assert_eq!(sink.chunks.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn relation_failure_after_entities_leaves_entity_writes_standing() {
        struct FailRelationsOnly {
            inner: MockExtractor,
        }

        #[async_trait]
        impl Extractor for FailRelationsOnly {
            async fn extract_entities(
                &self,
                chunk_text: &str,
            ) -> Result<Vec<CandidateEntity>, ExtractError> {
                self.inner.extract_entities(chunk_text).await
            }

            async fn extract_relations(
                &self,
                _chunk_text: &str,
            ) -> Result<Vec<CandidateRelation>, ExtractError> {
                Err(ExtractError::Backend("connection reset".to_string()))
            }
        }

        let sink = Arc::new(RecordingSink::default());
        let index = Arc::new(OntologyIndex::from_rows(&[], FuzzyConfig::default()));
        let extractor: Arc<dyn Extractor> = Arc::new(FailRelationsOnly {
            inner: MockExtractor::new(),
        });
        let runner = Runner::new(sink.clone(), Some(extractor), index, &test_config());

        let summary = runner
            .run(Uuid::new_v4(), vec![chunk("doc", 0, "aspirin treats fever reliably")])
            .await
            .unwrap();

        assert_eq!(summary.chunks_skipped, 1);
        assert_eq!(summary.relations_written, 0);
        // The entity upserts from before the failure are kept, not rolled back.
        assert!(summary.entities_written > 0);
        assert!(!sink.entities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn relation_with_missing_endpoint_is_skipped_not_fatal() {
        struct GhostRelation;

        #[async_trait]
        impl Extractor for GhostRelation {
            async fn extract_entities(
                &self,
                _chunk_text: &str,
            ) -> Result<Vec<CandidateEntity>, ExtractError> {
                Ok(vec![CandidateEntity {
                    name: "aspirin".to_string(),
                    entity_type: "Drug".to_string(),
                    relation: None,
                }])
            }

            async fn extract_relations(
                &self,
                _chunk_text: &str,
            ) -> Result<Vec<CandidateRelation>, ExtractError> {
                Ok(vec![CandidateRelation {
                    entity1: "aspirin".to_string(),
                    entity2: "never extracted".to_string(),
                    relation_type: "treats".to_string(),
                    confidence: Some(0.9),
                }])
            }
        }

        let sink = Arc::new(RecordingSink::default());
        let index = Arc::new(OntologyIndex::from_rows(&[], FuzzyConfig::default()));
        let extractor: Arc<dyn Extractor> = Arc::new(GhostRelation);
        let runner = Runner::new(sink.clone(), Some(extractor), index, &test_config());

        let summary = runner
            .run(Uuid::new_v4(), vec![chunk("doc", 0, "aspirin")])
            .await
            .unwrap();

        assert_eq!(summary.chunks_processed, 1);
        assert_eq!(summary.relations_written, 0);
        assert_eq!(summary.relations_skipped, 1);
        assert!(sink.relations.lock().unwrap().is_empty());
    }

    #[test]
    fn endpoint_resolution_prefers_the_name_map() {
        let map = DashMap::new();
        map.insert("Fever".to_string(), "C1".to_string());

        assert_eq!(resolve_endpoint(&map, "Fever"), "C1");
        assert_eq!(resolve_endpoint(&map, " Fever "), "C1");
        // unseen names fall back to the deterministic slug
        assert_eq!(resolve_endpoint(&map, "High Fever"), "high_fever");
    }

    #[test]
    fn summary_separates_processed_and_skipped() {
        let mut summary = RunSummary::default();

        let mut ok = ChunkReport::new("d#0");
        ok.state = ChunkState::RelationsPersisted;
        ok.entities_written = 3;
        ok.relations_written = 2;
        summary.absorb(&ok);

        let mut skipped = ChunkReport::new("d#1");
        skipped.state = ChunkState::Skipped("entity extraction: timeout".to_string());
        summary.absorb(&skipped);

        assert_eq!(summary.chunks_total, 2);
        assert_eq!(summary.chunks_processed, 1);
        assert_eq!(summary.chunks_skipped, 1);
        assert_eq!(summary.entities_written, 3);
        assert_eq!(summary.relations_written, 2);
    }
}
