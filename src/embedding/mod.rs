/// Embedding & Indexing
///
/// Local embedding generation and nearest-neighbour search over PDF chunks.
/// - EmbeddingProvider trait for abstraction
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - HNSW for vector similarity search
/// - VectorStore for the persisted, checksummed chunk index
mod provider;
mod store;
mod vector_index;

pub use provider::{canonical_model_name, EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use store::{Chunk, EmbeddedChunk, IndexManifest, ScoredChunk, VectorStore};
pub use vector_index::{SearchResult, VectorIndex, VectorIndexError};

use crate::config::IndexingConfig;
use serde::{Deserialize, Serialize};

/// HNSW build parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HnswParams {
    /// Connections per layer
    pub m: usize,
    /// Higher means better recall and a slower build
    pub ef_construction: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
        }
    }
}

impl From<&IndexingConfig> for HnswParams {
    fn from(config: &IndexingConfig) -> Self {
        Self {
            m: config.hnsw_m,
            ef_construction: config.hnsw_ef_construction,
        }
    }
}
