//! Corpus download and local caching

use std::path::Path;

use tracing::{info, instrument};

use crate::domain::DomainError;
use crate::infrastructure::llm::HttpClientTrait;

/// Fetches the book once and reuses the local copy afterwards
#[derive(Debug)]
pub struct CorpusLoader<C: HttpClientTrait> {
    client: C,
}

impl<C: HttpClientTrait> CorpusLoader<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Return the corpus text, downloading it to `storage_path` if missing
    #[instrument(skip(self), fields(path = %storage_path.display()))]
    pub async fn load(&self, url: &str, storage_path: &Path) -> Result<String, DomainError> {
        if tokio::fs::try_exists(storage_path).await.unwrap_or(false) {
            info!("Using cached corpus");
            return tokio::fs::read_to_string(storage_path).await.map_err(|e| {
                DomainError::storage(format!("Failed to read corpus: {}", e))
            });
        }

        info!(url, "Downloading corpus");
        let text = self.client.get_text(url).await?;

        if text.trim().is_empty() {
            return Err(DomainError::retrieval(format!(
                "Corpus downloaded from {} is empty",
                url
            )));
        }

        if let Some(parent) = storage_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::storage(format!("Failed to create corpus directory: {}", e))
            })?;
        }

        tokio::fs::write(storage_path, &text)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to write corpus: {}", e)))?;

        info!(bytes = text.len(), "Corpus stored");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::{HttpClient, MockHttpClient};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_downloads_once_then_reuses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dom_casmurro.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("CAPÍTULO PRIMEIRO\nDo título"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("data").join("livro.txt");
        let url = format!("{}/dom_casmurro.txt", server.uri());
        let loader = CorpusLoader::new(HttpClient::new());

        let first = loader.load(&url, &storage).await.unwrap();
        let second = loader.load(&url, &storage).await.unwrap();

        assert_eq!(first, "CAPÍTULO PRIMEIRO\nDo título");
        assert_eq!(first, second);
        assert!(storage.exists());
    }

    #[tokio::test]
    async fn test_cached_file_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("livro.txt");
        std::fs::write(&storage, "texto local").unwrap();

        let loader = CorpusLoader::new(MockHttpClient::new().with_error("http://x", "offline"));

        assert_eq!(loader.load("http://x", &storage).await.unwrap(), "texto local");
    }

    #[tokio::test]
    async fn test_download_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("livro.txt");

        let loader = CorpusLoader::new(MockHttpClient::new().with_error("http://x", "404"));

        assert!(loader.load("http://x", &storage).await.is_err());
        assert!(!storage.exists());
    }

    #[tokio::test]
    async fn test_empty_download_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("livro.txt");

        let loader = CorpusLoader::new(MockHttpClient::new().with_text("http://x", "  "));

        assert!(loader.load("http://x", &storage).await.is_err());
    }
}
