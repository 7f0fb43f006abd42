//! Gemini API Provider.
//!
//! Implements the `LLMProvider` trait over the Generative Language REST API:
//! `streamGenerateContent` (as Server-Sent Events) for answers and
//! `generateContent` with a response schema for structured output.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{LLMProvider, TextStream};
use super::sse;
use super::types::ResponseSchema;
use crate::config::Config;
use crate::error::{ConfigError, LlmError};

/// Environment variables checked for the credential, in order
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini Provider configuration and state.
pub struct GeminiProvider {
    client: Client,
    api_base: String,
    model: String,
}

impl GeminiProvider {
    /// Build a provider with an explicit credential.
    pub fn new(api_key: &str, config: &Config) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| ConfigError::Invalid("API key contains invalid characters".into()))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Build a provider from the process environment.
    pub fn from_env(config: &Config) -> Result<Self, ConfigError> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Build a provider, resolving the credential through `lookup`.
    pub fn from_lookup<F>(config: &Config, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingCredential(API_KEY_VARS[0]))?;

        Self::new(api_key.trim(), config)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, self.model, method)
    }

    async fn post(&self, url: &str, request: &GenerateRequest<'_>) -> Result<Response, LlmError> {
        let response = self.client.post(url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_completion(&self, prompt: &str) -> Result<TextStream, LlmError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let request = GenerateRequest::new(prompt, None);

        debug!(model = %self.model, "opening answer stream");
        let response = self.post(&url, &request).await?;

        let fragments = sse::data_events(response.bytes_stream()).filter_map(|event| async move {
            match event {
                Ok(data) => match decode_chunk(&data) {
                    Ok(text) if text.is_empty() => None,
                    other => Some(other),
                },
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(fragments))
    }

    async fn structured_completion(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String, LlmError> {
        let url = self.endpoint("generateContent");
        let request = GenerateRequest::new(
            prompt,
            Some(GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
        );

        debug!(model = %self.model, "requesting structured completion");
        let response = self.post(&url, &request).await?;
        let body = response.text().await?;
        decode_chunk(&body)
    }
}

/// Extract the text of one `GenerateContentResponse` JSON document.
fn decode_chunk(data: &str) -> Result<String, LlmError> {
    let response: GenerateResponse =
        serde_json::from_str(data).map_err(|e| LlmError::Decode(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(LlmError::Api {
            status: error.code,
            body: error.message,
        });
    }

    Ok(response.text())
}

// -----------------------------------------------------------------------------
// Gemini DTOs (Data Transfer Objects)
// -----------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, generation_config: Option<GenerationConfig<'a>>) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config,
        }
    }
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a ResponseSchema,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}
