use anyhow::{Context, Result, bail};
use ingest::ChunkerConfig;
use ontology::FuzzyConfig;
use std::path::PathBuf;
use store::StoreSettings;

/// How chunk text is turned into entities and relations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtractionMode {
    /// Call the language-understanding collaborator.
    Llm,
    /// Deterministic extractor, no collaborator needed.
    Mock,
    /// Persist chunks only; verifies store connectivity without any
    /// extraction calls.
    SkipLlm,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ConcurrencyConfig {
    pub max_concurrent_chunks: usize,
    pub max_concurrent_llm_calls: usize,
}

/// Full run configuration, built once in `main` and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreSettings,
    pub docs_dir: PathBuf,
    pub ontology_csv: PathBuf,
    pub chunking: ChunkerConfig,
    pub fuzzy: FuzzyConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub concurrency: ConcurrencyConfig,
    pub mode: ExtractionMode,
    pub max_chunks: Option<usize>,
}

impl Config {
    /// Read configuration from the process environment. Store URI and
    /// password have no usable defaults and are required.
    pub fn from_env() -> Result<Self> {
        let store = StoreSettings {
            uri: require("KG_NEO4J_URI")?,
            user: env_or("KG_NEO4J_USER", "neo4j"),
            password: require("KG_NEO4J_PASS")?,
            database: std::env::var("KG_NEO4J_DB").ok(),
        };

        let chunking = ChunkerConfig {
            chunk_size: env_parse("KG_CHUNK_SIZE", 800)?,
            chunk_overlap: env_parse("KG_CHUNK_OVERLAP", 100)?,
        };

        let fuzzy = FuzzyConfig {
            enabled: parse_bool(&env_or("KG_FUZZY_ENABLED", "true"))?,
            cutoff: env_parse("KG_FUZZY_CUTOFF", 0.85)?,
        };

        let mode = resolve_mode(
            parse_bool(&env_or("KG_SKIP_LLM", "false"))?,
            parse_bool(&env_or("KG_MOCK_EXTRACTION", "false"))?,
        );

        let max_chunks = match std::env::var("KG_MAX_CHUNKS") {
            Ok(raw) => Some(raw.parse().context("invalid KG_MAX_CHUNKS")?),
            Err(_) => None,
        };

        Ok(Self {
            store,
            docs_dir: PathBuf::from(env_or("KG_DOCS_DIR", "input")),
            ontology_csv: PathBuf::from(env_or("KG_ONTOLOGY_CSV", "data/ontology/concepts.csv")),
            chunking,
            fuzzy,
            llm: LlmConfig {
                base_url: env_or("KG_OLLAMA_URL", "http://localhost:11434"),
                model: env_or("KG_OLLAMA_MODEL", "mistral"),
            },
            retry: RetryConfig {
                max_retries: env_parse("KG_MAX_RETRIES", 3)?,
                initial_backoff_ms: env_parse("KG_INITIAL_BACKOFF_MS", 1000)?,
                max_backoff_ms: env_parse("KG_MAX_BACKOFF_MS", 10000)?,
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_chunks: env_parse("KG_MAX_CONCURRENT_CHUNKS", 5)?,
                max_concurrent_llm_calls: env_parse("KG_MAX_CONCURRENT_LLM_CALLS", 3)?,
            },
            mode,
            max_chunks,
        })
    }
}

/// Skip-LLM wins over mock: it is the narrower smoke-test mode.
fn resolve_mode(skip_llm: bool, mock: bool) -> ExtractionMode {
    if skip_llm {
        ExtractionMode::SkipLlm
    } else if mock {
        ExtractionMode::Mock
    } else {
        ExtractionMode::Llm
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required environment variable {}", key))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid value for {}", key)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => bail!("expected boolean, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_parsing_accepts_common_forms() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn skip_llm_takes_precedence_over_mock() {
        assert_eq!(resolve_mode(true, true), ExtractionMode::SkipLlm);
        assert_eq!(resolve_mode(false, true), ExtractionMode::Mock);
        assert_eq!(resolve_mode(false, false), ExtractionMode::Llm);
    }
}
