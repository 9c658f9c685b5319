use crate::error::StoreError;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use extract::CanonicalEntity;
use ingest::Chunk;
use neo4rs::{ConfigBuilder, Graph, Query};
use ontology::ConceptRow;

/// The per-chunk write operations the runner drives. `GraphWriter` is the
/// store-backed implementation; tests substitute their own.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn upsert_chunk(&self, chunk: &Chunk) -> Result<(), StoreError>;

    async fn upsert_entity_and_link(
        &self,
        chunk_id: &str,
        entity: &CanonicalEntity,
    ) -> Result<(), StoreError>;

    async fn upsert_relation(
        &self,
        entity1_id: &str,
        entity2_id: &str,
        relation_type: &str,
        confidence: Option<f64>,
    ) -> Result<(), StoreError>;
}

/// Connection parameters for the graph store.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
}

/// Idempotent graph-write engine. Every operation is a merge-by-identity
/// followed by attribute sets, so any write can be replayed safely; the
/// retry policy wraps each statement uniformly.
pub struct GraphWriter {
    graph: Graph,
    retry: RetryPolicy,
}

impl GraphWriter {
    pub async fn connect(settings: &StoreSettings, retry: RetryPolicy) -> Result<Self, StoreError> {
        let mut builder = ConfigBuilder::default()
            .uri(&settings.uri)
            .user(&settings.user)
            .password(&settings.password);
        if let Some(database) = &settings.database {
            builder = builder.db(database.as_str());
        }
        let config = builder.build().map_err(StoreError::from_driver)?;

        let graph = Graph::connect(config).await.map_err(StoreError::from_driver)?;
        Ok(Self { graph, retry })
    }

    /// Startup handshake: a trivial query proves the store is reachable and
    /// the credentials are valid before any ingestion begins.
    pub async fn verify_connectivity(&self) -> Result<(), StoreError> {
        self.run_with_retry("verify_connectivity", Query::new("RETURN 1".to_string()))
            .await
    }

    /// Create lookup indexes for the merge keys used below.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for (name, statement) in [
            (
                "chunk_id_index",
                "CREATE INDEX chunk_id_index IF NOT EXISTS FOR (c:Chunk) ON (c.id)",
            ),
            (
                "entity_id_index",
                "CREATE INDEX entity_id_index IF NOT EXISTS FOR (e:Entity) ON (e.id)",
            ),
            (
                "concept_id_index",
                "CREATE INDEX concept_id_index IF NOT EXISTS FOR (c:Concept) ON (c.concept_id)",
            ),
        ] {
            self.run_with_retry(name, Query::new(statement.to_string()))
                .await?;
        }
        Ok(())
    }

    /// Merge one Concept node per row and a PARENT_OF edge where the parent
    /// exists. A parent id with no matching concept yields no edge.
    pub async fn ingest_ontology(&self, rows: &[ConceptRow]) -> Result<(), StoreError> {
        for row in rows {
            let query = Query::new(
                r#"
                MERGE (c:Concept {concept_id: $concept_id})
                SET c.term = $term
                "#
                .to_string(),
            )
            .param("concept_id", row.concept_id.clone())
            .param("term", row.term.clone());

            self.run_with_retry("upsert_concept", query).await?;

            if let Some(parent_id) = &row.parent_id {
                let query = Query::new(
                    r#"
                    MATCH (p:Concept {concept_id: $parent_id})
                    MATCH (c:Concept {concept_id: $concept_id})
                    MERGE (p)-[:PARENT_OF]->(c)
                    "#
                    .to_string(),
                )
                .param("parent_id", parent_id.clone())
                .param("concept_id", row.concept_id.clone());

                self.run_with_retry("upsert_parent_link", query).await?;
            }
        }

        Ok(())
    }

    /// Node and edge counts for the run summary.
    pub async fn stats(&self) -> Result<GraphStats, StoreError> {
        Ok(GraphStats {
            chunk_count: self.count("MATCH (c:Chunk) RETURN count(c) AS count").await?,
            entity_count: self.count("MATCH (e:Entity) RETURN count(e) AS count").await?,
            relation_count: self
                .count("MATCH ()-[r:RELATES_TO]->() RETURN count(r) AS count")
                .await?,
        })
    }

    async fn count(&self, statement: &str) -> Result<usize, StoreError> {
        let query = Query::new(statement.to_string());
        self.retry
            .run("count", || {
                let query = query.clone();
                async move {
                    let mut stream = self
                        .graph
                        .execute(query)
                        .await
                        .map_err(StoreError::from_driver)?;
                    let row = stream.next().await.map_err(StoreError::from_driver)?;
                    Ok(row.and_then(|r| r.get::<i64>("count").ok()).unwrap_or(0) as usize)
                }
            })
            .await
    }

    async fn run_with_retry(&self, operation: &str, query: Query) -> Result<(), StoreError> {
        self.retry
            .run(operation, || {
                let query = query.clone();
                async move { self.graph.run(query).await.map_err(StoreError::from_driver) }
            })
            .await
    }
}

#[async_trait]
impl GraphSink for GraphWriter {
    /// Merge a Chunk node by id and refresh its attributes.
    async fn upsert_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        let query = Query::new(
            r#"
            MERGE (c:Chunk {id: $id})
            SET c.text = $text,
                c.source = $source,
                c.position = $position
            "#
            .to_string(),
        )
        .param("id", chunk.chunk_id.clone())
        .param("text", chunk.text.clone())
        .param("source", chunk.source.clone())
        .param("position", chunk.index as i64);

        self.run_with_retry("upsert_chunk", query).await
    }

    /// Merge an Entity node by id, link it to its containing chunk, and add
    /// the optional concept mapping and relation-hint tag.
    async fn upsert_entity_and_link(
        &self,
        chunk_id: &str,
        entity: &CanonicalEntity,
    ) -> Result<(), StoreError> {
        let query = Query::new(
            r#"
            MATCH (c:Chunk {id: $chunk_id})
            MERGE (e:Entity {id: $entity_id})
            SET e.name = $entity_name,
                e.type = $entity_type
            MERGE (c)-[:CONTAINS]->(e)
            "#
            .to_string(),
        )
        .param("chunk_id", chunk_id.to_string())
        .param("entity_id", entity.id.clone())
        .param("entity_name", entity.name.clone())
        .param("entity_type", entity.entity_type.clone());

        self.run_with_retry("upsert_entity", query).await?;

        // The MAPS_TO merge matches the Concept node rather than creating
        // it; an absent concept simply yields no edge.
        if let Some(concept_id) = &entity.concept_id {
            let query = Query::new(
                r#"
                MATCH (e:Entity {id: $entity_id})
                MATCH (o:Concept {concept_id: $concept_id})
                MERGE (e)-[:MAPS_TO]->(o)
                "#
                .to_string(),
            )
            .param("entity_id", entity.id.clone())
            .param("concept_id", concept_id.clone());

            self.run_with_retry("upsert_concept_mapping", query).await?;
        }

        if let Some(hint) = &entity.relation_hint {
            let query = Query::new(
                r#"
                MATCH (e:Entity {id: $entity_id})
                MERGE (r:Relation {type: $relation})
                MERGE (e)-[:HAS_RELATION]->(r)
                "#
                .to_string(),
            )
            .param("entity_id", entity.id.clone())
            .param("relation", hint.clone());

            self.run_with_retry("upsert_relation_tag", query).await?;
        }

        Ok(())
    }

    /// Merge a typed RELATES_TO edge between two existing entities. The
    /// edge is keyed by (source, target, type); a provided confidence
    /// overwrites the stored one, an absent confidence preserves it.
    ///
    /// Endpoints are matched, never created: if either is missing the
    /// operation fails with `UnresolvedRelationEndpoint` and the caller
    /// skips this relation.
    async fn upsert_relation(
        &self,
        entity1_id: &str,
        entity2_id: &str,
        relation_type: &str,
        confidence: Option<f64>,
    ) -> Result<(), StoreError> {
        let statement = match confidence {
            Some(_) => {
                r#"
                MATCH (a:Entity {id: $e1_id})
                MATCH (b:Entity {id: $e2_id})
                MERGE (a)-[r:RELATES_TO {type: $relation_type}]->(b)
                SET r.confidence = $confidence
                RETURN count(r) AS merged
                "#
            }
            None => {
                r#"
                MATCH (a:Entity {id: $e1_id})
                MATCH (b:Entity {id: $e2_id})
                MERGE (a)-[r:RELATES_TO {type: $relation_type}]->(b)
                RETURN count(r) AS merged
                "#
            }
        };

        let mut query = Query::new(statement.to_string())
            .param("e1_id", entity1_id.to_string())
            .param("e2_id", entity2_id.to_string())
            .param("relation_type", relation_type.to_string());
        if let Some(confidence) = confidence {
            query = query.param("confidence", confidence);
        }

        let merged = self
            .retry
            .run("upsert_relation", || {
                let query = query.clone();
                async move {
                    let mut stream = self
                        .graph
                        .execute(query)
                        .await
                        .map_err(StoreError::from_driver)?;
                    let row = stream.next().await.map_err(StoreError::from_driver)?;
                    Ok(row.and_then(|r| r.get::<i64>("merged").ok()).unwrap_or(0))
                }
            })
            .await?;

        if merged == 0 {
            return Err(StoreError::UnresolvedRelationEndpoint(format!(
                "{} -[{}]-> {}",
                entity1_id, relation_type, entity2_id
            )));
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct GraphStats {
    pub chunk_count: usize,
    pub entity_count: usize,
    pub relation_count: usize,
}
