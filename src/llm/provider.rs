//! The Provider Abstraction.
//!
//! This trait defines the standard interface for a hosted text-generation
//! backend. The session receives an already constructed provider, so a
//! missing credential surfaces where the provider is built.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::types::ResponseSchema;
use crate::error::LlmError;

/// Partial text fragments in arrival order, ending when the response closes.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// The core trait for LLM interactions.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Identifier of the model every request targets.
    fn model_id(&self) -> &str;

    /// Open a streaming generation for a single text prompt.
    async fn stream_completion(&self, prompt: &str) -> Result<TextStream, LlmError>;

    /// Run a non-streaming generation whose output is constrained by `schema`.
    /// Returns the raw response text.
    async fn structured_completion(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String, LlmError>;
}
