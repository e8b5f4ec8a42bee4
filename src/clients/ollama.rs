//! Ollama (native local) client.
//!
//! Talks to Ollama's own `/api/generate` endpoint with a `format: json`
//! hint. Local servers return JSON with varying amounts of decoration,
//! so parsing tolerates raw JSON, fenced JSON, and objects wrapping the
//! array under a known key.

use super::chunking::{CHUNK_OVERLAP_CHARS, map_chunks, split_into_chunks};
use super::{
    ClientConfig, ExtractRequest, GenerateRequest, LlmClient, LlmHttpConfig, assemble_prompt,
    build_http_client, parse_items, status_error, transport_error, triples_from_items,
};
use crate::models::Triple;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ollama local LLM client.
#[derive(Debug)]
pub struct OllamaClient {
    /// Model identifier.
    model_id: String,
    /// Server URL.
    base_url: String,
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

impl OllamaClient {
    /// Default server URL.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "llama3.1";

    /// Default parallel workers (lower than hosted API).
    pub const DEFAULT_MAX_WORKERS: usize = 5;

    /// Default chunks per batch (lower than hosted API).
    pub const DEFAULT_BATCH_LENGTH: usize = 5;

    /// Creates a client from a configuration, applying Ollama defaults
    /// for unset values.
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

    /// Checks if the Ollama server is reachable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Makes a generate request and returns the response text.
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
        operation: &str,
    ) -> Result<String> {
        let request = GenerateApiRequest {
            model: self.model_id.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: "json".to_string(),
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .map_err(|e| transport_error("ollama", &self.model_id, operation, &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(status_error("ollama", &self.model_id, operation, status, &body));
        }

        let response: GenerateApiResponse = response.json().map_err(|e| {
            tracing::error!(
                provider = "ollama",
                model = %self.model_id,
                error = %e,
                "Failed to parse LLM response envelope"
            );
            Error::Parse {
                operation: operation.to_string(),
                cause: e.to_string(),
            }
        })?;

        Ok(response.response)
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
        let text = self.generate(
            &prompt,
            request.temperature,
            request.max_tokens,
            "ollama_extract",
        )?;
        let items = parse_items(&text, "ollama_extract")?;
        Ok(triples_from_items(items, "ollama_extract"))
    }
}

impl LlmClient for OllamaClient {
    fn extract(&self, request: &ExtractRequest<'_>) -> Result<Vec<Triple>> {
        let chunks = split_into_chunks(request.text, self.max_char_buffer, CHUNK_OVERLAP_CHARS);
        let mut merged = Vec::new();

        // Batches run sequentially so a local server never sees more
        // than one batch of in-flight requests.
        for (batch_index, batch) in chunks.chunks(self.batch_length.max(1)).enumerate() {
            let results = map_chunks(batch, self.max_workers, |index, chunk| {
                let triples = self.extract_chunk(chunk, request)?;
                if self.show_progress {
                    tracing::debug!(
                        provider = "ollama",
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
        let text = self.generate(
            &prompt,
            request.temperature,
            request.max_tokens,
            "ollama_generate_json",
        )?;
        parse_items(&text, "ollama_generate_json")
    }

    fn model_name(&self) -> String {
        format!("ollama/{}", self.model_id)
    }

    fn supports_structured_output(&self) -> bool {
        false
    }
}

/// Request to the Generate API.
#[derive(Debug, Serialize)]
struct GenerateApiRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: String,
    options: GenerateOptions,
}

/// Model options for a generate request.
#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response from the Generate API.
#[derive(Debug, Deserialize)]
struct GenerateApiResponse {
    response: String,
}
