use crate::config::Config;
use crate::embedding::{EmbeddingProvider, FastEmbedProvider, HnswParams, ScoredChunk, VectorStore};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Embeds questions and looks them up in a loaded vector store
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<VectorStore>,
    ef_search: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<VectorStore>, ef_search: usize) -> Self {
        Self {
            embedder,
            store,
            ef_search,
        }
    }

    /// Load the configured index and embedding model.
    ///
    /// Blocks: the model may be downloaded and the HNSW graph is rebuilt.
    pub fn from_config(config: &Config) -> Result<Self> {
        let index_dir = crate::config::expand_path(&config.paths.index_dir)?;
        let store = VectorStore::load(
            &index_dir,
            &config.embedding.model,
            HnswParams::from(&config.indexing),
        )?;
        let embedder = FastEmbedProvider::new(&config.embedding.model, config.embedding.batch_size)?;

        info!(
            chunks = store.len(),
            index = %index_dir.display(),
            "Retriever ready"
        );

        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(store),
            config.indexing.ef_search,
        ))
    }

    /// The `k` chunks most similar to `question`, best first.
    pub fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query = self.embedder.embed(question)?;
        let hits = self.store.search(&query, k, self.ef_search)?;
        Ok(hits)
    }
}
