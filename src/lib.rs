//! docqa - ask questions about a PDF
//!
//! Extracts a document's text, splits it into overlapping chunks, ranks the
//! chunks against each question by keyword overlap and streams an answer from
//! a hosted language model grounded in the best chunks.

pub mod chunking;
pub mod config;
pub mod error;
pub mod generate;
pub mod llm;
pub mod render;
pub mod repl;
pub mod sample;
pub mod search;
pub mod session;

pub use chunking::{chunk_text, join_context, Chunk, Chunker, PdfChunker, Upload, WindowChunker};
pub use config::Config;
pub use error::{ConfigError, GenerationError, LlmError, UploadError};
pub use generate::{generate_answer_stream, generate_sample_questions};
pub use llm::{GeminiProvider, LLMProvider, Message, Role};
pub use repl::run_repl;
pub use search::SearchEngine;
pub use session::{AskOutcome, Document, LoadOutcome, Phase, Session};
