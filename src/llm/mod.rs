//! LLM Layer
//!
//! This module handles all interactions with the hosted language model:
//! - Provider abstraction (streaming and schema-constrained calls)
//! - Gemini REST client
//! - Server-Sent Events decoding

pub mod gemini;
pub mod provider;
pub mod sse;
pub mod types;

// Re-export key types
pub use gemini::GeminiProvider;
pub use provider::{LLMProvider, TextStream};
pub use types::{Message, ResponseSchema, Role, SchemaType};
