use super::{PromptTemplate, Retriever};
use crate::config::{ChainMode, RetrievalConfig};
use crate::embedding::ScoredChunk;
use crate::error::{MedibotError, Result};
use crate::llm::{GenerationParams, TextGenerator};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Generated answer and the passages it was conditioned on
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub result: String,
    pub source_documents: Vec<ScoredChunk>,
}

/// Retrieval-augmented question answering
pub struct QaChain {
    retriever: Arc<Retriever>,
    generator: Arc<dyn TextGenerator>,
    prompt: PromptTemplate,
    top_k: usize,
    chain_mode: ChainMode,
    params: GenerationParams,
}

impl QaChain {
    pub fn new(
        retriever: Arc<Retriever>,
        generator: Arc<dyn TextGenerator>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        Ok(Self {
            retriever,
            generator,
            prompt: PromptTemplate::qa(&config.prompt_template)?,
            top_k: config.top_k,
            chain_mode: config.chain_mode,
            params: GenerationParams::from(config),
        })
    }

    pub async fn invoke(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(MedibotError::InvalidInput(
                "Question must not be empty".to_string(),
            ));
        }

        let retriever = Arc::clone(&self.retriever);
        let owned_question = question.to_string();
        let top_k = self.top_k;
        let sources = tokio::task::spawn_blocking(move || retriever.retrieve(&owned_question, top_k))
            .await
            .map_err(|e| MedibotError::Other(anyhow::anyhow!("retrieval task failed: {}", e)))??;

        debug!(sources = sources.len(), "Retrieved passages");

        let context = self.combine(&sources);
        let prompt = self
            .prompt
            .render(&[("context", &context), ("question", question)])?;

        let result = self.generator.generate(&prompt, &self.params).await?;

        info!(
            model = %self.generator.model_id(),
            sources = sources.len(),
            answer_len = result.len(),
            "Answered question"
        );

        Ok(Answer {
            result: result.trim().to_string(),
            source_documents: sources,
        })
    }

    fn combine(&self, sources: &[ScoredChunk]) -> String {
        match self.chain_mode {
            ChainMode::Stuff => sources
                .iter()
                .map(|s| s.chunk.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{
        Chunk, EmbeddedChunk, EmbeddingError, EmbeddingProvider, HnswParams, VectorStore,
    };
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embeds by keyword presence so results are predictable
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 3] = ["fever", "cough", "rash"];

    impl EmbeddingProvider for KeywordEmbedder {
        fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            let lower = text.to_lowercase();
            let mut v: Vec<f32> = KEYWORDS
                .iter()
                .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                .collect();
            v.push(0.01);
            Ok(v)
        }

        fn embed_batch(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            KEYWORDS.len() + 1
        }

        fn model_name(&self) -> &str {
            "keyword"
        }
    }

    /// Records the prompt and echoes a fixed answer
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(
            &self,
            prompt: &str,
            params: &GenerationParams,
        ) -> std::result::Result<String, LlmError> {
            assert_eq!(params.max_new_tokens, 512);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("  Rest and fluids.  ".to_string())
        }

        fn model_id(&self) -> &str {
            "recording"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> std::result::Result<String, LlmError> {
            Err(LlmError::Status {
                status: 503,
                detail: "Model is loading".to_string(),
            })
        }

        fn model_id(&self) -> &str {
            "failing"
        }
    }

    fn retriever() -> Arc<Retriever> {
        let embedder = KeywordEmbedder;
        let texts = [
            "A fever is a raised body temperature.",
            "A dry cough has no phlegm.",
            "A rash changes skin colour.",
        ];
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(i, t)| EmbeddedChunk {
                chunk: Chunk {
                    id: i as u64,
                    source: "guide.pdf".to_string(),
                    page: 1,
                    text: t.to_string(),
                },
                embedding: embedder.embed(t).unwrap(),
            })
            .collect();
        let store = VectorStore::build("keyword", 4, chunks, HnswParams::default()).unwrap();
        Arc::new(Retriever::new(Arc::new(embedder), Arc::new(store), 32))
    }

    #[tokio::test]
    async fn test_invoke_stuffs_context() {
        let generator = Arc::new(RecordingGenerator {
            prompts: Mutex::new(Vec::new()),
        });
        let mut config = RetrievalConfig::default();
        config.top_k = 2;
        let chain = QaChain::new(retriever(), generator.clone(), &config).unwrap();

        let answer = chain.invoke("How do I treat a fever?").await.unwrap();
        assert_eq!(answer.result, "Rest and fluids.");
        assert_eq!(answer.source_documents.len(), 2);
        assert!(answer.source_documents[0].chunk.text.contains("fever"));

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Question: How do I treat a fever?"));
        assert!(prompts[0].contains("A fever is a raised body temperature.\n\n"));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let generator = Arc::new(RecordingGenerator {
            prompts: Mutex::new(Vec::new()),
        });
        let chain = QaChain::new(retriever(), generator.clone(), &RetrievalConfig::default())
            .unwrap();

        let result = chain.invoke("   ").await;
        assert!(matches!(result, Err(MedibotError::InvalidInput(_))));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generator_failure_is_backend_failure() {
        let chain = QaChain::new(
            retriever(),
            Arc::new(FailingGenerator),
            &RetrievalConfig::default(),
        )
        .unwrap();

        let err = chain.invoke("rash?").await.unwrap_err();
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_bad_template_rejected() {
        let mut config = RetrievalConfig::default();
        config.prompt_template = "Only {question}".to_string();
        let result = QaChain::new(retriever(), Arc::new(FailingGenerator), &config);
        assert!(matches!(result, Err(MedibotError::Prompt(_))));
    }
}
