//! LM Studio (OpenAI-compatible local) client.
//!
//! LM Studio serves the chat-completions wire format on localhost. The
//! `response_format` JSON-mode parameter is never sent: many local
//! servers reject or mis-handle it. JSON output is steered with a
//! system message instead, and replies are parsed tolerantly (fenced or
//! bare JSON).

use super::chunking::{CHUNK_OVERLAP_CHARS, map_chunks, split_into_chunks};
use super::{
    ClientConfig, ExtractRequest, GenerateRequest, LlmClient, LlmHttpConfig, assemble_prompt,
    build_http_client, parse_items, status_error, transport_error, triples_from_items,
};
use crate::models::Triple;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSON_SYSTEM_MESSAGE: &str = "You are a helpful assistant that extracts information into \
    structured JSON. Follow the provided format exactly, matching the field names and structure \
    of the examples. You may use ```json code fences. Do not include any preamble or extra \
    explanations.";

/// LM Studio local LLM client.
#[derive(Debug)]
pub struct LmStudioClient {
    /// Model identifier (LM Studio uses whichever model is loaded).
    model_id: String,
    /// Server URL.
    base_url: String,
    /// API key (LM Studio accepts a placeholder).
    api_key: String,
    /// Maximum parallel workers (kept low for local models).
    max_workers: usize,
    /// Chunks per batch (kept low for local models).
    batch_length: usize,
    /// Maximum characters per chunk.
    max_char_buffer: usize,
    /// Whether to emit per-chunk progress logging.
    show_progress: bool,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl LmStudioClient {
    /// Default server URL.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:1234/v1";

    /// Default model placeholder.
    pub const DEFAULT_MODEL: &'static str = "local-model";

    /// Default API key placeholder.
    pub const DEFAULT_API_KEY: &'static str = "lm-studio";

    /// Default parallel workers (lower than hosted API).
    pub const DEFAULT_MAX_WORKERS: usize = 5;

    /// Default chunks per batch (lower than hosted API).
    pub const DEFAULT_BATCH_LENGTH: usize = 5;

    /// Creates a client from a configuration, applying LM Studio
    /// defaults for unset values.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            model_id: config
                .model_id
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_ENDPOINT.to_string()),
            api_key: config
                .api_key
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_API_KEY.to_string()),
            max_workers: config.max_workers.unwrap_or(Self::DEFAULT_MAX_WORKERS),
            batch_length: config.batch_length.unwrap_or(Self::DEFAULT_BATCH_LENGTH),
            max_char_buffer: config.max_char_buffer,
            show_progress: config.show_progress,
            client: build_http_client(LlmHttpConfig::from_timeout_secs(config.timeout_seconds)),
        }
    }

    /// Sets the server URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.base_url = endpoint.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_id = model.into();
        self
    }

    /// Checks if the LM Studio server is reachable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/models", self.base_url))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Makes a chat-completions request and returns the reply text.
    ///
    /// Deliberately omits `response_format`; JSON is steered via the
    /// system message.
    fn chat(
        &self,
        user_prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
        operation: &str,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model_id.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: JSON_SYSTEM_MESSAGE.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .map_err(|e| transport_error("lmstudio", &self.model_id, operation, &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(status_error(
                "lmstudio",
                &self.model_id,
                operation,
                status,
                &body,
            ));
        }

        let response: ChatCompletionResponse = response.json().map_err(|e| {
            tracing::error!(
                provider = "lmstudio",
                model = %self.model_id,
                error = %e,
                "Failed to parse LLM response envelope"
            );
            Error::Parse {
                operation: operation.to_string(),
                cause: e.to_string(),
            }
        })?;

        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| Error::Parse {
                operation: operation.to_string(),
                cause: "no choices in response".to_string(),
            })
    }

    /// Extracts triples from a single chunk.
    fn extract_chunk(&self, chunk: &str, request: &ExtractRequest<'_>) -> Result<Vec<Triple>> {
        let prompt = assemble_prompt(
            request.prompt_description,
            request.schema_hint,
            request.examples,
            chunk,
            true,
        );
        let text = self.chat(
            &prompt,
            request.temperature,
            request.max_tokens,
            "lmstudio_extract",
        )?;
        let items = parse_items(&text, "lmstudio_extract")?;
        Ok(triples_from_items(items, "lmstudio_extract"))
    }
}

impl LlmClient for LmStudioClient {
    fn extract(&self, request: &ExtractRequest<'_>) -> Result<Vec<Triple>> {
        let chunks = split_into_chunks(request.text, self.max_char_buffer, CHUNK_OVERLAP_CHARS);
        let mut merged = Vec::new();

        for (batch_index, batch) in chunks.chunks(self.batch_length.max(1)).enumerate() {
            let results = map_chunks(batch, self.max_workers, |index, chunk| {
                let triples = self.extract_chunk(chunk, request)?;
                if self.show_progress {
                    tracing::debug!(
                        provider = "lmstudio",
                        batch = batch_index + 1,
                        chunk = index + 1,
                        triples = triples.len(),
                        "Processed chunk"
                    );
                }
                Ok(triples)
            });
            for result in results {
                merged.extend(result?);
            }
        }

        Ok(merged)
    }

    fn generate_json(&self, request: &GenerateRequest<'_>) -> Result<Vec<Value>> {
        let prompt = assemble_prompt(
            request.prompt_description,
            request.schema_hint,
            &[],
            request.text,
            true,
        );
        let text = self.chat(
            &prompt,
            request.temperature,
            request.max_tokens,
            "lmstudio_generate_json",
        )?;
        parse_items(&text, "lmstudio_generate_json")
    }

    fn model_name(&self) -> String {
        format!("lmstudio/{}", self.model_id)
    }

    fn supports_structured_output(&self) -> bool {
        false
    }
}

/// Request to the Chat Completions API.
///
/// `response_format` is intentionally absent from this struct.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// A message in the chat.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from the Chat Completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// A choice in the response.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
