//! Answer and suggestion generation
//!
//! Builds the prompts and drives the two model calls. Neither function
//! touches conversation state; the session does that.

use futures::StreamExt;
use tracing::{debug, error, warn};

use crate::error::GenerationError;
use crate::llm::{LLMProvider, ResponseSchema};

/// Maximum number of suggested questions kept from a response
pub const MAX_SUGGESTIONS: usize = 3;

/// Build the grounded-answer prompt.
pub fn answer_prompt(query: &str, context: &str) -> String {
    format!(
        "
You are a helpful assistant that answers questions based on the provided document context.
Your goal is to provide a clear and concise answer using ONLY the information from the context below.
Format your answer using markdown where appropriate (e.g., lists, bolding).
If the answer cannot be found in the context, state that you cannot find the answer in the provided document.
Do not use any external knowledge.

--- CONTEXT ---
{context}
--- END CONTEXT ---

QUESTION: {query}

ANSWER:
"
    )
}

/// Build the prompt asking for candidate questions.
pub fn suggestion_prompt(context: &str) -> String {
    format!(
        "
Based on the following document context, generate {MAX_SUGGESTIONS} concise and distinct questions that a user might ask.

--- CONTEXT ---
{context}
--- END CONTEXT ---
"
    )
}

/// Stream an answer for `query`, invoking `on_chunk` with every fragment in
/// arrival order before the next one is requested.
///
/// Any transport or API failure aborts the call; fragments already delivered
/// are not retracted.
pub async fn generate_answer_stream<F>(
    provider: &dyn LLMProvider,
    query: &str,
    context: &str,
    mut on_chunk: F,
) -> Result<(), GenerationError>
where
    F: FnMut(&str) + Send,
{
    let prompt = answer_prompt(query, context);

    let mut stream = provider.stream_completion(&prompt).await.map_err(|e| {
        error!(error = %e, "failed to open answer stream");
        GenerationError::from(e)
    })?;

    let mut fragments = 0usize;
    while let Some(fragment) = stream.next().await {
        let fragment = fragment.map_err(|e| {
            error!(error = %e, fragments, "answer stream failed");
            GenerationError::from(e)
        })?;
        on_chunk(&fragment);
        fragments += 1;
    }

    debug!(fragments, model = provider.model_id(), "answer stream finished");
    Ok(())
}

/// Ask the model for up to three questions about `context`.
///
/// Best effort: any failure yields an empty list.
pub async fn generate_sample_questions(provider: &dyn LLMProvider, context: &str) -> Vec<String> {
    let schema = ResponseSchema::string_array("A potential user question about the document.");

    match provider
        .structured_completion(&suggestion_prompt(context), &schema)
        .await
    {
        Ok(text) => parse_questions(&text),
        Err(e) => {
            warn!(error = %e, "failed to generate sample questions");
            Vec::new()
        }
    }
}

/// Parse a JSON array of strings, keeping at most three entries.
///
/// Malformed JSON or any other shape gives an empty list.
pub fn parse_questions(text: &str) -> Vec<String> {
    let value: serde_json::Value = match serde_json::from_str(text.trim()) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "suggestion response is not valid JSON");
            return Vec::new();
        }
    };

    let Some(items) = value.as_array() else {
        warn!("suggestion response is not an array");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| item.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}
