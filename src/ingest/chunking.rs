use super::PageDocument;

/// Splits page text into overlapping windows of words
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

/// A chunk before embedding
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub source: String,
    pub page: u32,
    pub text: String,
}

impl TextChunker {
    /// `chunk_overlap` is clamped below `chunk_size` so windows always advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::new();
        let step = self.chunk_size - self.chunk_overlap;
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));

            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Chunk every page, keeping its source and page number. Blank pages
    /// produce nothing.
    pub fn chunk_pages(&self, pages: &[PageDocument]) -> Vec<TextChunk> {
        pages
            .iter()
            .flat_map(|page| {
                self.split_text(&page.text)
                    .into_iter()
                    .map(move |text| TextChunk {
                        source: page.source.clone(),
                        page: page.page,
                        text,
                    })
            })
            .collect()
    }
}
