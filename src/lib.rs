//! MediBot - Medical Question Answering Chatbot
//!
//! Ingests PDF documents into a local, checksummed vector index and answers
//! questions by retrieving the most relevant passages and handing them to a
//! hosted language model. Alongside the chat it scores the PHQ-9 and GAD-7
//! screening questionnaires and keeps a session-scoped mood log.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod mood;
pub mod rag;
pub mod screening;
pub mod server;
pub mod session;

pub use error::{MedibotError, Result};
