//! Index command - download the book and build the vector index

use std::sync::Arc;

use clap::Args;
use tracing::info;

use super::Cli;
use crate::config::AppConfig;
use crate::infrastructure::llm::{HttpClient, LlmProviderFactory};
use crate::infrastructure::retrieval::{CorpusLoader, IndexOrigin, IndexSettings, VectorIndex};

/// Arguments for the index command
#[derive(Debug, Clone, Args)]
pub struct IndexArgs {
    /// Rebuild even when the stored index is current
    #[arg(long)]
    pub rebuild: bool,
}

pub fn index_settings(config: &AppConfig) -> IndexSettings {
    IndexSettings {
        model: config.embedding.model.clone(),
        batch_size: config.embedding.batch_size,
        chunk_size: config.corpus.chunk_size,
        chunk_overlap: config.corpus.chunk_overlap,
        query_cache_capacity: config.retrieval.query_cache_capacity,
        source: Some(config.corpus.book_url.clone()),
    }
}

/// Load the corpus and reuse or build its index
pub async fn open_index(config: &AppConfig, rebuild: bool) -> anyhow::Result<Arc<VectorIndex>> {
    let corpus = CorpusLoader::new(HttpClient::new())
        .load(&config.corpus.book_url, &config.corpus.storage_path)
        .await?;

    let embedder = LlmProviderFactory::create_embedding(&config.llm)?;
    let settings = index_settings(config);

    if rebuild {
        let index = VectorIndex::build(embedder, &settings, &corpus).await?;
        index.save(&config.corpus.index_path).await?;
        info!(chunks = index.len(), "Vector index rebuilt");
        return Ok(Arc::new(index));
    }

    let (index, origin) =
        VectorIndex::load_or_build(embedder, &settings, &corpus, &config.corpus.index_path)
            .await?;

    if origin == IndexOrigin::Built {
        info!(chunks = index.len(), "Vector index built");
    }

    Ok(Arc::new(index))
}

/// Run the index command
pub async fn run(cli: &Cli, args: &IndexArgs) -> anyhow::Result<()> {
    let (config, _guard) = super::bootstrap(cli)?;
    config.require_api_key()?;

    let index = open_index(&config, args.rebuild).await?;

    println!(
        "Índice pronto: {} trechos em {} (fingerprint {})",
        index.len(),
        config.corpus.index_path.display(),
        index.fingerprint_hex()
    );

    Ok(())
}
