//! Gemini hosted-API client.
//!
//! Uses the `generateContent` endpoint with native structured output
//! (a response MIME type plus a JSON schema derived from the triple
//! shape). Long inputs are split into overlapping chunks processed in
//! parallel; `extraction_passes > 1` reruns the extraction and merges
//! results by the 3-tuple key.

use super::chunking::{CHUNK_OVERLAP_CHARS, map_chunks, split_into_chunks};
use super::{
    ClientConfig, ExtractRequest, GenerateRequest, LlmClient, LlmHttpConfig, assemble_prompt,
    build_http_client, parse_items, status_error, transport_error, triples_from_items,
};
use crate::models::{Triple, dedupe_triples};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client for Google Gemini models.
#[derive(Debug)]
pub struct GeminiClient {
    /// Model identifier.
    model_id: String,
    /// API key.
    api_key: String,
    /// API endpoint.
    base_url: String,
    /// Maximum parallel workers for long inputs.
    max_workers: usize,
    /// Maximum characters per chunk.
    max_char_buffer: usize,
    /// Number of extraction passes.
    extraction_passes: usize,
    /// Whether to emit per-chunk progress logging.
    show_progress: bool,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";

    /// Default parallel workers.
    pub const DEFAULT_MAX_WORKERS: usize = 10;

    /// Creates a client from a configuration, applying Gemini defaults
    /// for unset values.
    ///
    /// The API key is taken from the config, falling back to the
    /// `GEMINI_API_KEY` then `GOOGLE_API_KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when no API key can be resolved.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                Error::InvalidInput(
                    "no API key provided. Set api_key in the client config or the \
                     GEMINI_API_KEY/GOOGLE_API_KEY environment variable"
                        .to_string(),
                )
            })?;

        Ok(Self {
            model_id: config
                .model_id
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_ENDPOINT.to_string()),
            max_workers: config.max_workers.unwrap_or(Self::DEFAULT_MAX_WORKERS),
            max_char_buffer: config.max_char_buffer,
            extraction_passes: config.extraction_passes.max(1),
            show_progress: config.show_progress,
            client: build_http_client(LlmHttpConfig::from_timeout_secs(config.timeout_seconds)),
        })
    }

    /// Sets the API endpoint.
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

    /// Makes a `generateContent` request and returns the response text.
    fn generate_content(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: Option<u32>,
        response_schema: Option<Value>,
        operation: &str,
    ) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature,
                response_mime_type: "application/json".to_string(),
                response_schema,
                max_output_tokens: max_tokens,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model_id
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| transport_error("gemini", &self.model_id, operation, &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(status_error("gemini", &self.model_id, operation, status, &body));
        }

        let response: GenerateContentResponse = response.json().map_err(|e| {
            tracing::error!(
                provider = "gemini",
                model = %self.model_id,
                error = %e,
                "Failed to parse LLM response envelope"
            );
            Error::Parse {
                operation: operation.to_string(),
                cause: e.to_string(),
            }
        })?;

        Ok(response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default())
    }

    /// Extracts triples from a single chunk.
    fn extract_chunk(&self, chunk: &str, request: &ExtractRequest<'_>) -> Result<Vec<Triple>> {
        let prompt = assemble_prompt(
            request.prompt_description,
            request.schema_hint,
            request.examples,
            chunk,
            false,
        );
        let schema = Some(serde_json::json!({
            "type": "array",
            "items": request.schema_hint,
        }));
        let text = self.generate_content(
            &prompt,
            request.temperature,
            request.max_tokens,
            schema,
            "gemini_extract",
        )?;
        let items = parse_items(&text, "gemini_extract")?;
        Ok(triples_from_items(items, "gemini_extract"))
    }
}

impl LlmClient for GeminiClient {
    fn extract(&self, request: &ExtractRequest<'_>) -> Result<Vec<Triple>> {
        let chunks = split_into_chunks(request.text, self.max_char_buffer, CHUNK_OVERLAP_CHARS);
        let mut merged = Vec::new();

        for pass in 0..self.extraction_passes {
            let results = map_chunks(&chunks, self.max_workers, |index, chunk| {
                let triples = self.extract_chunk(chunk, request)?;
                if self.show_progress {
                    tracing::debug!(
                        provider = "gemini",
                        pass = pass + 1,
                        chunk = index + 1,
                        chunks = chunks.len(),
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

        if self.extraction_passes > 1 {
            Ok(dedupe_triples(merged))
        } else {
            Ok(merged)
        }
    }

    fn generate_json(&self, request: &GenerateRequest<'_>) -> Result<Vec<Value>> {
        let prompt = assemble_prompt(
            request.prompt_description,
            request.schema_hint,
            &[],
            request.text,
            false,
        );
        let schema = Some(serde_json::json!({
            "type": "array",
            "items": request.schema_hint,
        }));
        let text = self.generate_content(
            &prompt,
            request.temperature,
            request.max_tokens,
            schema,
            "gemini_generate_json",
        )?;
        parse_items(&text, "gemini_generate_json")
    }

    fn model_name(&self) -> String {
        self.model_id.clone()
    }

    fn supports_structured_output(&self) -> bool {
        true
    }
}

/// Request to the `generateContent` API.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

/// A content block of prompt parts.
#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

/// A single text part.
#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

/// Generation parameters.
#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Response from the `generateContent` API.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// A response candidate.
#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

/// Content of a response candidate.
#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GeminiClient {
        GeminiClient::from_config(&ClientConfig::default().with_api_key("test-key")).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let client = test_client();
        assert_eq!(client.model_id, GeminiClient::DEFAULT_MODEL);
        assert_eq!(client.base_url, GeminiClient::DEFAULT_ENDPOINT);
        assert_eq!(client.max_workers, GeminiClient::DEFAULT_MAX_WORKERS);
        assert!(client.supports_structured_output());
        assert_eq!(client.model_name(), "gemini-2.0-flash");
    }

    #[test]
    fn test_config_overrides_kept() {
        let config = ClientConfig::default()
            .with_api_key("test-key")
            .with_model_id("gemini-2.5-pro")
            .with_max_workers(2)
            .with_extraction_passes(3);
        let client = GeminiClient::from_config(&config).unwrap();
        assert_eq!(client.model_id, "gemini-2.5-pro");
        assert_eq!(client.max_workers, 2);
        assert_eq!(client.extraction_passes, 3);
    }

    #[test]
    fn test_missing_api_key_rejected() {
        // No api_key in config; only fails when the env vars are also
        // absent, so scope the check to that case.
        if std::env::var("GEMINI_API_KEY").is_err() && std::env::var("GOOGLE_API_KEY").is_err() {
            let result = GeminiClient::from_config(&ClientConfig::default());
            assert!(matches!(result, Err(Error::InvalidInput(_))));
        }
    }

    #[test]
    fn test_builder_overrides() {
        let client = test_client()
            .with_endpoint("http://localhost:9999")
            .with_model("gemini-exp");
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.model_id, "gemini-exp");
    }
}
