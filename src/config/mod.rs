//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CheckpointBackend, CheckpointConfig, CorpusConfig, EmbeddingConfig, LlmConfig,
    LogFormat, LoggingConfig, RetrievalConfig, WorkflowConfig,
};
