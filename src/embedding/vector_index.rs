/// HNSW vector index for similarity search
use hnsw_rs::prelude::*;
use std::path::PathBuf;
use thiserror::Error;

/// hnsw_rs caps the layer count at 16
const MAX_LAYERS: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index not found at {0} - run `medibot ingest` first")]
    IndexNotFound(PathBuf),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Unrecognised index format: {0}")]
    UnsupportedFormat(String),

    #[error("Index schema version {found} is not supported (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("Index payload checksum mismatch: manifest says {expected}, file hashes to {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Index was built with embedding model '{index_model}' but '{configured}' is configured")]
    ModelMismatch {
        index_model: String,
        configured: String,
    },

    #[error("Corrupt index: {0}")]
    Corrupt(String),

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Search result with ID and similarity score
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Position of the item in the owning store
    pub id: u64,
    /// Cosine similarity score (higher is more similar)
    pub score: f32,
}

/// HNSW vector index wrapper
///
/// Provides approximate nearest neighbor search using cosine distance.
/// The graph itself is never written to disk; stores rebuild it from their
/// embeddings on load.
pub struct VectorIndex {
    index: Hnsw<'static, f32, DistCosine>,
    dimension: usize,
    count: u64,
}

impl VectorIndex {
    /// Create a new vector index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `capacity` - Expected number of vectors
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    /// * `m` - HNSW M parameter (number of connections per layer)
    pub fn new(dimension: usize, capacity: usize, ef_construction: usize, m: usize) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(
            m,
            capacity.max(1),
            MAX_LAYERS,
            ef_construction,
            DistCosine,
        );

        Self {
            index,
            dimension,
            count: 0,
        }
    }

    /// Insert a vector into the index
    pub fn insert(&mut self, id: u64, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let data = vector.to_vec();
        self.index.insert((&data, id as usize));
        self.count += 1;

        Ok(())
    }

    /// Search for k nearest neighbors
    ///
    /// # Returns
    /// At most `k` results, sorted by score descending
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchResult>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .index
            .search(query, k, ef_search.max(k))
            .into_iter()
            .map(|neighbor| SearchResult {
                id: neighbor.d_id as u64,
                score: 1.0 - neighbor.distance,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        Ok(results)
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, i: usize, value: f32) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[i] = value;
        v
    }

    #[test]
    fn test_index_creation() {
        let index = VectorIndex::new(384, 10, 200, 16);
        assert_eq!(index.dimension(), 384);
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let mut index = VectorIndex::new(8, 3, 200, 16);

        let vec1 = axis(8, 0, 1.0);
        let vec2 = axis(8, 1, 1.0);
        let mut vec3 = vec![0.0; 8];
        vec3[0] = 0.9;
        vec3[1] = 0.1;

        index.insert(0, &vec1).unwrap();
        index.insert(1, &vec2).unwrap();
        index.insert(2, &vec3).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search(&vec1, 2, 50).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 0);
        assert!(results[0].score > 0.99);
        assert_eq!(results[1].id, 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(4, 1, 200, 16);
        let results = index.search(&[1.0, 0.0, 0.0, 0.0], 3, 50).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let mut index = VectorIndex::new(384, 1, 200, 16);

        let result = index.insert(1, &[1.0; 128]);
        assert!(matches!(
            result,
            Err(VectorIndexError::InvalidDimension {
                expected: 384,
                actual: 128
            })
        ));
        assert!(index.search(&[1.0; 12], 1, 10).is_err());
    }
}
