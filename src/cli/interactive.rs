//! Line-mode surfaces: the question/answer loop and the screening prompt.
//!
//! Both read from any `BufRead` and write to any `Write` so `main` can hand
//! them stdin/stdout.
use std::io::{self, BufRead, Write};

use tokio::runtime::Runtime;

use crate::error::{MedibotError, Result};
use crate::rag::{Answer, QaChain};
use crate::screening::Questionnaire;

const CHAT_PROMPT: &str = "Write Query Here : ";
const GOODBYE: &str = "Exiting chatbot. Goodbye!";
const RETRY_HINT: &str = "Please answer 0-3 or one of the option labels.";

enum Line {
    Eof,
    Text(String),
    /// Bytes were consumed but were not valid UTF-8
    Unreadable(io::Error),
}

fn next_line<R: BufRead>(input: &mut R) -> Result<Line> {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => Ok(Line::Eof),
        Ok(_) => Ok(Line::Text(line)),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Ok(Line::Unreadable(e)),
        Err(e) => Err(MedibotError::Io {
            source: e,
            context: "Failed to read input".to_string(),
        }),
    }
}

fn output_error(e: io::Error) -> MedibotError {
    MedibotError::Io {
        source: e,
        context: "Failed to write output".to_string(),
    }
}

pub fn write_answer<W: Write>(out: &mut W, answer: &Answer) -> io::Result<()> {
    writeln!(out, "RESULT: {}", answer.result)?;
    writeln!(out)?;
    writeln!(out, "SOURCE DOCUMENTS:")?;
    for (i, doc) in answer.source_documents.iter().enumerate() {
        writeln!(
            out,
            "  [{}] {} (page {}, score {:.3})",
            i + 1,
            doc.chunk.source,
            doc.chunk.page,
            doc.score
        )?;
        writeln!(out, "      {}", doc.chunk.text)?;
    }
    Ok(())
}

/// Question/answer loop.
///
/// Ends on `exit` (any case, surrounding whitespace ignored) or end of input.
/// `build` is called on the first question and again after any failed build;
/// every failure is reported as "An error occurred: ..." and the loop goes on.
pub fn run_chat<R, W, B>(mut input: R, out: &mut W, rt: &Runtime, mut build: B) -> Result<()>
where
    R: BufRead,
    W: Write,
    B: FnMut() -> Result<QaChain>,
{
    let mut chain: Option<QaChain> = None;

    loop {
        write!(out, "{}", CHAT_PROMPT).map_err(output_error)?;
        out.flush().map_err(output_error)?;

        let line = match next_line(&mut input)? {
            Line::Eof => break,
            Line::Text(line) => line,
            Line::Unreadable(e) => {
                writeln!(out, "An error occurred: {}", e).map_err(output_error)?;
                continue;
            }
        };

        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        if chain.is_none() {
            match build() {
                Ok(built) => chain = Some(built),
                Err(e) => {
                    writeln!(out, "An error occurred: {}", e).map_err(output_error)?;
                    continue;
                }
            }
        }
        let Some(qa) = chain.as_ref() else {
            continue;
        };

        match rt.block_on(qa.invoke(query)) {
            Ok(answer) => {
                write_answer(out, &answer).map_err(output_error)?;
                writeln!(out).map_err(output_error)?;
            }
            Err(e) => writeln!(out, "An error occurred: {}", e).map_err(output_error)?,
        }
    }

    writeln!(out, "{}", GOODBYE).map_err(output_error)?;
    Ok(())
}

/// Ask each item in turn, accepting an option number or label.
/// Anything else re-asks the same item.
pub fn prompt_responses<R, W>(
    mut input: R,
    out: &mut W,
    questionnaire: &Questionnaire,
) -> Result<Vec<u8>>
where
    R: BufRead,
    W: Write,
{
    let mut responses = Vec::with_capacity(questionnaire.item_count());

    writeln!(out, "{}", questionnaire.title).map_err(output_error)?;
    writeln!(
        out,
        "Over the last 2 weeks, how often have you been bothered by the following?"
    )
    .map_err(output_error)?;

    for (i, item) in questionnaire.items.iter().enumerate() {
        writeln!(out).map_err(output_error)?;
        writeln!(out, "{}. {}", i + 1, item).map_err(output_error)?;
        for option in questionnaire.options {
            writeln!(out, "   {}) {}", option.score, option.label).map_err(output_error)?;
        }

        loop {
            write!(out, "> ").map_err(output_error)?;
            out.flush().map_err(output_error)?;

            let line = match next_line(&mut input)? {
                Line::Eof => {
                    return Err(MedibotError::InvalidInput(
                        "Questionnaire was not completed".to_string(),
                    ))
                }
                Line::Text(line) => line,
                Line::Unreadable(_) => String::new(),
            };

            let answer = line.trim();
            let score = answer
                .parse::<u8>()
                .ok()
                .filter(|s| questionnaire.options.iter().any(|o| o.score == *s))
                .or_else(|| questionnaire.option_score(answer));

            match score {
                Some(score) => {
                    responses.push(score);
                    break;
                }
                None => writeln!(out, "{}", RETRY_HINT).map_err(output_error)?,
            }
        }
    }

    writeln!(out).map_err(output_error)?;
    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::embedding::{
        Chunk, EmbeddedChunk, EmbeddingError, EmbeddingProvider, HnswParams, VectorStore,
    };
    use crate::llm::{GenerationParams, LlmError, TextGenerator};
    use crate::rag::Retriever;
    use crate::screening::QuestionnaireId;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FeverEmbedder;

    impl EmbeddingProvider for FeverEmbedder {
        fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            let fever = if text.to_lowercase().contains("fever") { 1.0 } else { 0.0 };
            Ok(vec![fever, 0.2])
        }

        fn embed_batch(
            &self,
            texts: &[String],
        ) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "fever"
        }
    }

    /// Fails the first `failures` calls, then answers
    struct FlakyGenerator {
        failures: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for FlakyGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> std::result::Result<String, LlmError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(LlmError::Status {
                    status: 503,
                    detail: "Model is loading".to_string(),
                });
            }
            Ok("Drink fluids.".to_string())
        }

        fn model_id(&self) -> &str {
            "flaky"
        }
    }

    fn chain(generator_failures: usize) -> Result<QaChain> {
        let embedder = FeverEmbedder;
        let chunks = ["A fever is a raised temperature.", "Sleep helps recovery."]
            .iter()
            .enumerate()
            .map(|(i, text)| EmbeddedChunk {
                chunk: Chunk {
                    id: i as u64,
                    source: "guide.pdf".to_string(),
                    page: 1,
                    text: text.to_string(),
                },
                embedding: embedder.embed(text).unwrap(),
            })
            .collect();
        let store = VectorStore::build("fever", 2, chunks, HnswParams::default())?;
        let retriever = Retriever::new(Arc::new(embedder), Arc::new(store), 16);
        let generator = FlakyGenerator {
            failures: AtomicUsize::new(generator_failures),
        };
        QaChain::new(
            Arc::new(retriever),
            Arc::new(generator),
            &RetrievalConfig::default(),
        )
    }

    fn chat(script: &[u8], build: impl FnMut() -> Result<QaChain>) -> String {
        let rt = Runtime::new().unwrap();
        let mut out = Vec::new();
        run_chat(Cursor::new(script.to_vec()), &mut out, &rt, build).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_exit_is_trimmed_and_case_insensitive() {
        let mut builds = 0;
        let out = chat(b"  EXIT \nWhat is a fever?\n", || {
            builds += 1;
            chain(0)
        });

        assert_eq!(builds, 0);
        assert!(out.ends_with(&format!("{}\n", GOODBYE)));
        assert!(!out.contains("RESULT:"));
    }

    #[test]
    fn test_end_of_input_ends_loop() {
        let out = chat(b"What is a fever?\n", || chain(0));
        assert!(out.contains("RESULT: Drink fluids."));
        assert!(out.ends_with(&format!("{}\n", GOODBYE)));
    }

    #[test]
    fn test_failed_question_does_not_end_loop() {
        let out = chat(b"What is a fever?\nAnd now?\nexit\n", || chain(1));

        let error = out.find("An error occurred: ").unwrap();
        let result = out.find("RESULT: Drink fluids.").unwrap();
        assert!(error < result);
        assert!(out.contains("Model is loading"));
        assert!(out.contains("SOURCE DOCUMENTS:"));
    }

    #[test]
    fn test_failed_build_is_retried() {
        let mut builds = 0;
        let out = chat(b"first\nsecond\nexit\n", || {
            builds += 1;
            if builds == 1 {
                Err(MedibotError::Config("index missing".to_string()))
            } else {
                chain(0)
            }
        });

        assert_eq!(builds, 2);
        assert!(out.contains("An error occurred: Configuration error: index missing"));
        assert!(out.contains("RESULT: Drink fluids."));
    }

    #[test]
    fn test_invalid_utf8_line_is_reported() {
        let out = chat(b"\xff\xfe\nWhat is a fever?\nexit\n", || chain(0));

        let error = out.find("An error occurred: ").unwrap();
        let result = out.find("RESULT:").unwrap();
        assert!(error < result);
        assert!(out.ends_with(&format!("{}\n", GOODBYE)));
    }

    #[test]
    fn test_prompt_accepts_numbers_and_labels() {
        let gad7 = Questionnaire::get(QuestionnaireId::Gad7);
        let script = b"2\nseveral days\n7\nNOT AT ALL\n3\n0\n1\nmore than half the days\n";
        let mut out = Vec::new();

        let responses = prompt_responses(Cursor::new(script.to_vec()), &mut out, gad7).unwrap();

        assert_eq!(responses, vec![2, 1, 0, 3, 0, 1, 2]);
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches(RETRY_HINT).count(), 1);
        assert!(out.contains(gad7.title));
    }

    #[test]
    fn test_prompt_incomplete_input() {
        let phq9 = Questionnaire::get(QuestionnaireId::Phq9);
        let mut out = Vec::new();

        let result = prompt_responses(Cursor::new(b"1\n2\n".to_vec()), &mut out, phq9);
        assert!(matches!(result, Err(MedibotError::InvalidInput(_))));
    }
}
