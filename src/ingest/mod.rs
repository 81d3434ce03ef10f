//! PDF ingestion
//!
//! Builds the persisted vector index from a directory of PDFs:
//! discover → load pages → chunk → embed in batches → save the store.

mod chunking;
mod loader;

pub use chunking::{TextChunk, TextChunker};
pub use loader::{discover_pdfs, load_pdf, PageDocument};

use crate::config::Config;
use crate::embedding::{Chunk, EmbeddedChunk, EmbeddingProvider, HnswParams, VectorStore};
use crate::error::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Data directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("No PDF documents with text found in {dir}")]
    NoDocuments { dir: PathBuf },

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },
}

/// Summary of an ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub pages: usize,
    pub chunks: usize,
    pub index_dir: PathBuf,
    pub duration_ms: u64,
}

/// Runs the ingestion pipeline with a given embedding provider
pub struct Ingestor {
    provider: Arc<dyn EmbeddingProvider>,
    data_dir: PathBuf,
    index_dir: PathBuf,
    chunker: TextChunker,
    batch_size: usize,
    hnsw: HnswParams,
}

impl Ingestor {
    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &Config) -> Self {
        Self {
            provider,
            data_dir: config.paths.data_dir.clone(),
            index_dir: config.paths.index_dir.clone(),
            chunker: TextChunker::new(
                config.indexing.chunk_size,
                config.indexing.chunk_overlap,
            ),
            batch_size: config.embedding.batch_size.max(1),
            hnsw: HnswParams::from(&config.indexing),
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = dir.into();
        self
    }

    /// Build and save the index, replacing any previous one.
    pub fn run(&self) -> Result<IngestReport> {
        let start = Instant::now();

        let files = discover_pdfs(&self.data_dir)?;
        info!(files = files.len(), dir = %self.data_dir.display(), "Discovered PDFs");

        let mut pages = Vec::new();
        for path in &files {
            pages.extend(load_pdf(path)?);
        }

        let text_chunks = self.chunker.chunk_pages(&pages);
        if text_chunks.is_empty() {
            return Err(IngestError::NoDocuments {
                dir: self.data_dir.clone(),
            }
            .into());
        }
        info!(pages = pages.len(), chunks = text_chunks.len(), "Chunked documents");

        let embedded = self.embed_chunks(text_chunks)?;
        let chunk_count = embedded.len();

        let store = VectorStore::build(
            self.provider.model_name(),
            self.provider.dimension(),
            embedded,
            self.hnsw,
        )?;
        store.save(&self.index_dir)?;

        let report = IngestReport {
            files: files.len(),
            pages: pages.len(),
            chunks: chunk_count,
            index_dir: self.index_dir.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            files = report.files,
            chunks = report.chunks,
            duration_ms = report.duration_ms,
            "Ingestion complete"
        );

        Ok(report)
    }

    fn embed_chunks(&self, text_chunks: Vec<TextChunk>) -> Result<Vec<EmbeddedChunk>> {
        let mut embedded = Vec::with_capacity(text_chunks.len());

        for batch in text_chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.provider.embed_batch(&texts)?;
            debug!(batch = batch.len(), done = embedded.len(), "Embedded batch");

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                embedded.push(EmbeddedChunk {
                    chunk: Chunk {
                        id: embedded.len() as u64,
                        source: chunk.source.clone(),
                        page: chunk.page,
                        text: chunk.text.clone(),
                    },
                    embedding,
                });
            }
        }

        Ok(embedded)
    }
}
