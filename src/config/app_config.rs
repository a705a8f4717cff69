use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::workflow::{DEFAULT_MAX_LOOPS, DEFAULT_MAX_STEPS};

const ENV_PREFIX: &str = "ORACULO";
const API_KEY_FALLBACK_VAR: &str = "GEMINI_API_KEY";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
    pub workflow: WorkflowConfig,
    pub checkpoint: CheckpointConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Directory for the rolling log file and the audit log
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Chat completion endpoint
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Texts per embeddings request
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub book_url: String,
    /// Local copy of the downloaded book
    pub storage_path: PathBuf,
    /// Persisted vector index
    pub index_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub query_cache_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_loops: u32,
    pub max_steps: usize,
    pub grading_concurrency: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    None,
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub backend: CheckpointBackend,
    /// Used by the file backend
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            directory: PathBuf::from("logs"),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: crate::infrastructure::llm::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "gemini-embedding-001".to_string(),
            batch_size: 64,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            book_url: "https://www.gutenberg.org/cache/epub/55752/pg55752.txt".to_string(),
            storage_path: PathBuf::from("data/dom_casmurro.txt"),
            index_path: PathBuf::from("data/index.json"),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            query_cache_capacity: 256,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_loops: DEFAULT_MAX_LOOPS,
            max_steps: DEFAULT_MAX_STEPS,
            grading_concurrency: 1,
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            directory: PathBuf::from("data/sessions"),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults, `config/default`, `config/local`, an optional
    /// explicit file, then `ORACULO__SECTION__KEY` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: Self = config.try_deserialize()?;
        app_config.apply_api_key_fallback(std::env::var(API_KEY_FALLBACK_VAR).ok());
        app_config.validate()?;

        Ok(app_config)
    }

    fn apply_api_key_fallback(&mut self, fallback: Option<String>) {
        let missing = self
            .llm
            .api_key
            .as_deref()
            .is_none_or(|key| key.trim().is_empty());

        if missing {
            self.llm.api_key = fallback.filter(|key| !key.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let invalid = |message: &str| Err(config::ConfigError::Message(message.to_string()));

        if self.corpus.chunk_size == 0 {
            return invalid("corpus.chunk_size must be greater than 0");
        }
        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            return invalid("corpus.chunk_overlap must be smaller than corpus.chunk_size");
        }
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be greater than 0");
        }
        if self.embedding.batch_size == 0 {
            return invalid("embedding.batch_size must be greater than 0");
        }
        if self.workflow.max_steps == 0 {
            return invalid("workflow.max_steps must be greater than 0");
        }
        if self.workflow.grading_concurrency == 0 {
            return invalid("workflow.grading_concurrency must be greater than 0");
        }

        Ok(())
    }

    /// API key, or a configuration error naming where to set it
    pub fn require_api_key(&self) -> Result<&str, config::ConfigError> {
        self.llm.api_key.as_deref().ok_or_else(|| {
            config::ConfigError::Message(format!(
                "No LLM API key configured: set {} or {}__LLM__API_KEY",
                API_KEY_FALLBACK_VAR, ENV_PREFIX
            ))
        })
    }
}
