//! Persisted chunk index
//!
//! On disk an index is a directory with two files:
//! - `chunks.zst`: zstd-compressed JSON array of chunks and their embeddings
//! - `manifest.json`: format tag, schema version, embedding model, dimension,
//!   chunk count and the BLAKE3 hash of `chunks.zst`
//!
//! Loading verifies every manifest field against the payload before the
//! HNSW graph is rebuilt. Nothing is executed or trusted blindly.

use super::provider::canonical_model_name;
use super::{HnswParams, VectorIndex, VectorIndexError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const INDEX_FORMAT: &str = "medibot-vector-index";
pub const INDEX_SCHEMA_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const PAYLOAD_FILE: &str = "chunks.zst";
const COMPRESSION_LEVEL: i32 = 3;

/// A passage of a source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u64,
    /// File name of the source PDF
    pub source: String,
    /// 1-based page number
    pub page: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A retrieved chunk and its similarity to the query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format: String,
    pub schema_version: u32,
    pub model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    /// BLAKE3 hex digest of the payload file
    pub checksum: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Chunks, their embeddings and the HNSW graph over them
pub struct VectorStore {
    model: String,
    dimension: usize,
    chunks: Vec<EmbeddedChunk>,
    index: VectorIndex,
}

impl VectorStore {
    /// Build an in-memory store. HNSW ids are positions in `chunks`.
    pub fn build(
        model: &str,
        dimension: usize,
        chunks: Vec<EmbeddedChunk>,
        params: HnswParams,
    ) -> Result<Self, VectorIndexError> {
        let mut index =
            VectorIndex::new(dimension, chunks.len(), params.ef_construction, params.m);

        for (position, item) in chunks.iter().enumerate() {
            index.insert(position as u64, &item.embedding)?;
        }

        tracing::debug!(chunks = chunks.len(), dimension, "Vector store built");

        Ok(Self {
            model: model.to_string(),
            dimension,
            chunks,
            index,
        })
    }

    /// Top `k` chunks by cosine similarity, best first
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<ScoredChunk>, VectorIndexError> {
        let hits = self.index.search(query, k, ef_search)?;

        hits.into_iter()
            .map(|hit| {
                self.chunks
                    .get(hit.id as usize)
                    .map(|item| ScoredChunk {
                        chunk: item.chunk.clone(),
                        score: hit.score,
                    })
                    .ok_or_else(|| {
                        VectorIndexError::Corrupt(format!("search returned unknown id {}", hit.id))
                    })
            })
            .collect()
    }

    /// Write the store to `dir`, replacing any previous index there.
    pub fn save(&self, dir: &Path) -> Result<IndexManifest, VectorIndexError> {
        fs::create_dir_all(dir).map_err(|e| VectorIndexError::Io {
            source: e,
            context: format!("Failed to create index directory: {}", dir.display()),
        })?;

        let json = serde_json::to_vec(&self.chunks)
            .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;
        let payload = zstd::encode_all(&json[..], COMPRESSION_LEVEL).map_err(|e| {
            VectorIndexError::Io {
                source: e,
                context: "Failed to compress index payload".to_string(),
            }
        })?;

        let manifest = IndexManifest {
            format: INDEX_FORMAT.to_string(),
            schema_version: INDEX_SCHEMA_VERSION,
            model: self.model.clone(),
            dimension: self.dimension,
            chunk_count: self.chunks.len(),
            checksum: blake3::hash(&payload).to_hex().to_string(),
            created_at: chrono::Utc::now(),
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| VectorIndexError::SerializationError(e.to_string()))?;

        // Payload first so a manifest never points at a missing payload
        write_atomic(&dir.join(PAYLOAD_FILE), &payload)?;
        write_atomic(&dir.join(MANIFEST_FILE), &manifest_json)?;

        tracing::info!(
            chunks = manifest.chunk_count,
            path = %dir.display(),
            "Vector index saved"
        );

        Ok(manifest)
    }

    /// Load and verify an index written by [`VectorStore::save`].
    pub fn load(
        dir: &Path,
        expected_model: &str,
        params: HnswParams,
    ) -> Result<Self, VectorIndexError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(VectorIndexError::IndexNotFound(dir.to_path_buf()));
        }

        let manifest = Self::read_manifest(&manifest_path)?;

        if manifest.format != INDEX_FORMAT {
            return Err(VectorIndexError::UnsupportedFormat(manifest.format));
        }
        if manifest.schema_version != INDEX_SCHEMA_VERSION {
            return Err(VectorIndexError::UnsupportedSchema {
                found: manifest.schema_version,
                expected: INDEX_SCHEMA_VERSION,
            });
        }
        if canonical_model_name(&manifest.model) != canonical_model_name(expected_model) {
            return Err(VectorIndexError::ModelMismatch {
                index_model: manifest.model,
                configured: expected_model.to_string(),
            });
        }

        let payload_path = dir.join(PAYLOAD_FILE);
        let payload = fs::read(&payload_path).map_err(|e| VectorIndexError::Io {
            source: e,
            context: format!("Failed to read index payload: {}", payload_path.display()),
        })?;

        let actual = blake3::hash(&payload).to_hex().to_string();
        if actual != manifest.checksum {
            return Err(VectorIndexError::ChecksumMismatch {
                expected: manifest.checksum,
                actual,
            });
        }

        let json = zstd::decode_all(&payload[..])
            .map_err(|e| VectorIndexError::Corrupt(format!("payload decompression: {}", e)))?;
        let chunks: Vec<EmbeddedChunk> = serde_json::from_slice(&json)
            .map_err(|e| VectorIndexError::Corrupt(format!("payload decoding: {}", e)))?;

        if chunks.len() != manifest.chunk_count {
            return Err(VectorIndexError::Corrupt(format!(
                "manifest lists {} chunks, payload has {}",
                manifest.chunk_count,
                chunks.len()
            )));
        }

        tracing::info!(
            chunks = chunks.len(),
            model = %manifest.model,
            "Vector index verified"
        );

        Self::build(&manifest.model, manifest.dimension, chunks, params)
    }

    fn read_manifest(path: &Path) -> Result<IndexManifest, VectorIndexError> {
        let content = fs::read_to_string(path).map_err(|e| VectorIndexError::Io {
            source: e,
            context: format!("Failed to read index manifest: {}", path.display()),
        })?;
        serde_json::from_str(&content)
            .map_err(|e| VectorIndexError::Corrupt(format!("manifest decoding: {}", e)))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn chunks(&self) -> &[EmbeddedChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), VectorIndexError> {
    let temp_path = PathBuf::from(format!("{}.tmp", path.display()));

    let mut file = fs::File::create(&temp_path).map_err(|e| VectorIndexError::Io {
        source: e,
        context: format!("Failed to create temp file: {}", temp_path.display()),
    })?;
    file.write_all(data).map_err(|e| VectorIndexError::Io {
        source: e,
        context: format!("Failed to write: {}", temp_path.display()),
    })?;
    file.sync_all().map_err(|e| VectorIndexError::Io {
        source: e,
        context: format!("Failed to sync: {}", temp_path.display()),
    })?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| VectorIndexError::Io {
        source: e,
        context: format!(
            "Failed to rename {} -> {}",
            temp_path.display(),
            path.display()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

    fn chunk(id: u64, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                id,
                source: "handbook.pdf".to_string(),
                page: id as u32 + 1,
                text: text.to_string(),
            },
            embedding,
        }
    }

    fn sample_store() -> VectorStore {
        let chunks = vec![
            chunk(0, "fever", vec![1.0, 0.0, 0.0, 0.0]),
            chunk(1, "cough", vec![0.0, 1.0, 0.0, 0.0]),
            chunk(2, "rash", vec![0.0, 0.0, 1.0, 0.0]),
            chunk(3, "fever and chills", vec![0.8, 0.2, 0.0, 0.0]),
        ];
        VectorStore::build(MODEL, 4, chunks, HnswParams::default()).unwrap()
    }

    #[test]
    fn test_search_returns_best_first() {
        let store = sample_store();
        let results = store.search(&[1.0, 0.0, 0.0, 0.0], 2, 32).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "fever");
        assert_eq!(results[1].chunk.text, "fever and chills");
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = sample_store();
        let manifest = store.save(temp.path()).unwrap();
        assert_eq!(manifest.chunk_count, 4);
        assert_eq!(manifest.checksum.len(), 64);

        // Short model name refers to the same model
        let loaded = VectorStore::load(temp.path(), "all-MiniLM-L6-v2", HnswParams::default())
            .unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.dimension(), 4);

        let results = loaded.search(&[0.0, 0.0, 1.0, 0.0], 1, 32).unwrap();
        assert_eq!(results[0].chunk.text, "rash");
        assert_eq!(results[0].chunk.page, 3);
    }

    #[test]
    fn test_missing_index() {
        let temp = TempDir::new().unwrap();
        let result = VectorStore::load(&temp.path().join("none"), MODEL, HnswParams::default());
        assert!(matches!(result, Err(VectorIndexError::IndexNotFound(_))));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let temp = TempDir::new().unwrap();
        sample_store().save(temp.path()).unwrap();

        let payload_path = temp.path().join(PAYLOAD_FILE);
        let mut bytes = fs::read(&payload_path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&payload_path, bytes).unwrap();

        let result = VectorStore::load(temp.path(), MODEL, HnswParams::default());
        assert!(matches!(
            result,
            Err(VectorIndexError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_model_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        sample_store().save(temp.path()).unwrap();

        let result = VectorStore::load(temp.path(), "bge-base-en-v1.5", HnswParams::default());
        assert!(matches!(result, Err(VectorIndexError::ModelMismatch { .. })));
    }

    #[test]
    fn test_unknown_schema_rejected() {
        let temp = TempDir::new().unwrap();
        sample_store().save(temp.path()).unwrap();

        let manifest_path = temp.path().join(MANIFEST_FILE);
        let mut manifest: IndexManifest =
            serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
        manifest.schema_version = 99;
        fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();

        let result = VectorStore::load(temp.path(), MODEL, HnswParams::default());
        assert!(matches!(
            result,
            Err(VectorIndexError::UnsupportedSchema {
                found: 99,
                expected: 1
            })
        ));
    }
}
