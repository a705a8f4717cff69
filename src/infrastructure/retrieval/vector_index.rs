//! In-memory cosine-similarity index over corpus chunks
//!
//! The index is persisted as JSON and tagged with a SHA-256 fingerprint of
//! the corpus and the chunking/embedding settings. A file whose fingerprint
//! does not match the current settings is rebuilt.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::chunker::RecursiveChunker;
use crate::domain::embedding::{cosine_similarity, EmbeddingProvider, EmbeddingRequest};
use crate::domain::retrieval::{Passage, Retriever};
use crate::domain::DomainError;

const INDEX_FORMAT_VERSION: u32 = 1;

/// Settings that determine index contents
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub model: String,
    pub batch_size: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub query_cache_capacity: u64,
    /// Source label attached to every passage
    pub source: Option<String>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            model: "gemini-embedding-001".to_string(),
            batch_size: 64,
            chunk_size: 1000,
            chunk_overlap: 200,
            query_cache_capacity: 256,
            source: None,
        }
    }
}

/// How an index was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Loaded,
    Built,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    id: String,
    content: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    fingerprint: String,
    model: String,
    chunks: Vec<IndexedChunk>,
}

pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    model: String,
    fingerprint: String,
    source: Option<String>,
    chunks: Vec<IndexedChunk>,
    query_cache: Cache<String, Arc<Vec<f32>>>,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("model", &self.model)
            .field("fingerprint", &self.fingerprint)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl VectorIndex {
    /// Fingerprint of the corpus plus every setting that changes the index
    pub fn fingerprint(corpus: &str, settings: &IndexSettings) -> String {
        let mut hasher = Sha256::new();
        hasher.update(INDEX_FORMAT_VERSION.to_le_bytes());
        hasher.update(settings.model.as_bytes());
        hasher.update([0]);
        hasher.update((settings.chunk_size as u64).to_le_bytes());
        hasher.update((settings.chunk_overlap as u64).to_le_bytes());
        hasher.update(corpus.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn from_parts(
        embedder: Arc<dyn EmbeddingProvider>,
        settings: &IndexSettings,
        fingerprint: String,
        chunks: Vec<IndexedChunk>,
    ) -> Self {
        let query_cache = Cache::builder()
            .max_capacity(settings.query_cache_capacity)
            .build();

        Self {
            embedder,
            model: settings.model.clone(),
            fingerprint,
            source: settings.source.clone(),
            chunks,
            query_cache,
        }
    }

    /// Chunk and embed the corpus
    pub async fn build(
        embedder: Arc<dyn EmbeddingProvider>,
        settings: &IndexSettings,
        corpus: &str,
    ) -> Result<Self, DomainError> {
        let chunker = RecursiveChunker::new(settings.chunk_size, settings.chunk_overlap)?;
        let texts = chunker.chunk(corpus);

        if texts.is_empty() {
            return Err(DomainError::retrieval("Corpus produced no chunks"));
        }

        info!(chunks = texts.len(), model = %settings.model, "Embedding corpus chunks");

        let mut chunks = Vec::with_capacity(texts.len());
        for batch in texts.chunks(settings.batch_size.max(1)) {
            let request = EmbeddingRequest::batch(&settings.model, batch.to_vec());
            let vectors = embedder.embed(request).await?.into_vectors();

            if vectors.len() != batch.len() {
                return Err(DomainError::retrieval(format!(
                    "Expected {} embeddings, received {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (content, embedding) in batch.iter().zip(vectors) {
                chunks.push(IndexedChunk {
                    id: format!("chunk-{}", chunks.len()),
                    content: content.clone(),
                    embedding,
                });
            }
            debug!(embedded = chunks.len(), "Batch embedded");
        }

        let fingerprint = Self::fingerprint(corpus, settings);
        Ok(Self::from_parts(embedder, settings, fingerprint, chunks))
    }

    /// Reuse the index at `path` when its fingerprint matches, else rebuild and save
    pub async fn load_or_build(
        embedder: Arc<dyn EmbeddingProvider>,
        settings: &IndexSettings,
        corpus: &str,
        path: &Path,
    ) -> Result<(Self, IndexOrigin), DomainError> {
        let expected = Self::fingerprint(corpus, settings);

        match Self::read_file(path).await {
            Ok(Some(file)) if file.version == INDEX_FORMAT_VERSION && file.fingerprint == expected => {
                info!(chunks = file.chunks.len(), path = %path.display(), "Loaded vector index");
                let index = Self::from_parts(embedder, settings, file.fingerprint, file.chunks);
                return Ok((index, IndexOrigin::Loaded));
            }
            Ok(Some(_)) => info!(path = %path.display(), "Vector index is stale, rebuilding"),
            Ok(None) => info!(path = %path.display(), "No vector index found, building"),
            Err(e) => warn!(error = %e, "Unreadable vector index, rebuilding"),
        }

        let index = Self::build(embedder, settings, corpus).await?;
        index.save(path).await?;

        Ok((index, IndexOrigin::Built))
    }

    async fn read_file(path: &Path) -> Result<Option<IndexFile>, DomainError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read index: {}", e)))?;

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| DomainError::storage(format!("Failed to parse index: {}", e)))
    }

    pub async fn save(&self, path: &Path) -> Result<(), DomainError> {
        let file = IndexFile {
            version: INDEX_FORMAT_VERSION,
            fingerprint: self.fingerprint.clone(),
            model: self.model.clone(),
            chunks: self.chunks.clone(),
        };

        let json = serde_json::to_string(&file)
            .map_err(|e| DomainError::storage(format!("Failed to serialize index: {}", e)))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::storage(format!("Failed to create index directory: {}", e))
            })?;
        }

        tokio::fs::write(path, json)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to write index: {}", e)))?;

        info!(path = %path.display(), chunks = self.chunks.len(), "Saved vector index");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn fingerprint_hex(&self) -> &str {
        &self.fingerprint
    }

    async fn query_embedding(&self, query: &str) -> Result<Arc<Vec<f32>>, DomainError> {
        if let Some(cached) = self.query_cache.get(query).await {
            debug!("Query embedding cache hit");
            return Ok(cached);
        }

        let response = self
            .embedder
            .embed(EmbeddingRequest::single(&self.model, query))
            .await?;

        let vector = response
            .into_vectors()
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::retrieval("Embedding provider returned no vector"))?;

        let vector = Arc::new(vector);
        self.query_cache
            .insert(query.to_string(), vector.clone())
            .await;

        Ok(vector)
    }
}

#[async_trait]
impl Retriever for VectorIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, DomainError> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.query_embedding(query).await?;

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(&query_vector, &chunk.embedding)))
            .collect();

        // Stable sort keeps chunk order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let passages = scored
            .into_iter()
            .take(k)
            .map(|(i, score)| {
                let chunk = &self.chunks[i];
                let mut passage = Passage::new(&chunk.id, &chunk.content)
                    .with_score(score)
                    .with_metadata("chunk_index", serde_json::json!(i));
                if let Some(source) = &self.source {
                    passage = passage.with_source(source);
                }
                passage
            })
            .collect::<Vec<_>>();

        debug!(k, returned = passages.len(), "Vector search");
        Ok(passages)
    }

    fn retriever_type(&self) -> &'static str {
        "vector_index"
    }
}
