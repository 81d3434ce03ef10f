/// Retrieval-augmented question answering
///
/// question → embed → top-k chunks → prompt → hosted model → answer + sources
mod chain;
mod prompt;
mod retriever;

pub use chain::{Answer, QaChain};
pub use prompt::{PromptError, PromptTemplate};
pub use retriever::Retriever;
