//! LLM client abstraction.
//!
//! Provides a uniform interface over heterogeneous LLM backends for
//! knowledge graph extraction:
//!
//! | Provider | Client | Structured output | Environment variables |
//! |----------|--------|-------------------|----------------------|
//! | Gemini (hosted) | [`GeminiClient`] | yes | `GEMINI_API_KEY`, `GOOGLE_API_KEY` |
//! | Ollama (local) | [`OllamaClient`] | no | — |
//! | LM Studio (local) | [`LmStudioClient`] | no | — |
//!
//! # Implementing a New Provider
//!
//! 1. Implement the [`LlmClient`] trait.
//! 2. Register a factory with [`register_client`] (the built-ins are
//!    registered when the registry is first touched).
//!
//! Every provider funnels its raw output through the shared recovery
//! and normalization helpers in this module, so the contract is uniform:
//! `extract` returns validated [`Triple`]s (malformed candidates are
//! dropped with a warning), `generate_json` returns raw objects for the
//! caller to validate.

pub mod chunking;
mod config;
mod factory;
mod gemini;
mod lmstudio;
mod ollama;

pub use config::ClientConfig;
pub use factory::{ClientFactory, create_client, list_client_types, register_client};
pub use gemini::GeminiClient;
pub use lmstudio::LmStudioClient;
pub use ollama::OllamaClient;

use crate::models::{ExampleRecord, RawTriple, Triple};
use crate::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Object keys under which providers have been observed to wrap the
/// result array.
const WRAPPER_KEYS: [&str; 5] = ["items", "triples", "data", "results", "extractions"];

/// Request for grounded extraction.
#[derive(Debug, Clone)]
pub struct ExtractRequest<'a> {
    /// The fully assembled prompt text.
    pub text: &'a str,
    /// Short instruction describing the extraction task.
    pub prompt_description: &'a str,
    /// Few-shot exemplars to marshal into the prompt.
    pub examples: &'a [ExampleRecord],
    /// JSON schema hint derived from the triple shape.
    pub schema_hint: &'a Value,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate, if bounded.
    pub max_tokens: Option<u32>,
}

/// Request for ungrounded structured generation.
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    /// The fully assembled prompt text.
    pub text: &'a str,
    /// Short instruction describing the generation task.
    pub prompt_description: &'a str,
    /// JSON schema hint for the requested objects.
    pub schema_hint: &'a Value,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate, if bounded.
    pub max_tokens: Option<u32>,
}

/// Uniform contract over LLM backends.
///
/// Clients hold no per-record mutable state and are safe for concurrent
/// use by independent records.
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Grounded extraction: returns a possibly empty list of validated
    /// triples. Malformed candidates are discarded with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure, timeout, or a
    /// non-2xx response, and [`Error::Parse`] when the body cannot be
    /// parsed as JSON even after fence stripping and substring recovery.
    fn extract(&self, request: &ExtractRequest<'_>) -> Result<Vec<Triple>>;

    /// Ungrounded structured generation: returns raw objects matching
    /// the schema shape. The caller validates them into triples.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`LlmClient::extract`].
    fn generate_json(&self, request: &GenerateRequest<'_>) -> Result<Vec<Value>>;

    /// Human-readable model identifier, stable for the client's
    /// lifetime.
    fn model_name(&self) -> String;

    /// Whether the backend can be told to emit JSON conforming to a
    /// schema natively. Affects prompt assembly only.
    fn supports_structured_output(&self) -> bool;
}

/// HTTP client configuration for LLM providers.
#[derive(Debug, Clone, Copy)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Builds the HTTP configuration from a per-request timeout in
    /// seconds (the unit carried by [`ClientConfig`]).
    #[must_use]
    pub const fn from_timeout_secs(timeout_seconds: u64) -> Self {
        Self {
            timeout_ms: timeout_seconds * 1000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Builds a blocking HTTP client for LLM requests with configured
/// timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build LLM HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Classifies and wraps a reqwest error as a transport error.
///
/// Centralized so every provider reports the same `error_kind`
/// taxonomy.
pub(crate) fn transport_error(
    provider: &'static str,
    model: &str,
    operation: &str,
    e: &reqwest::Error,
) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        provider = provider,
        model = %model,
        error = %e,
        error_kind = error_kind,
        "LLM request failed"
    );
    Error::Transport {
        operation: operation.to_string(),
        cause: format!("{error_kind} error: {e}"),
    }
}

/// Wraps a non-2xx response as a transport error.
pub(crate) fn status_error(
    provider: &'static str,
    model: &str,
    operation: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> Error {
    tracing::error!(
        provider = provider,
        model = %model,
        status = %status,
        body = %body,
        "LLM API returned error status"
    );
    Error::Transport {
        operation: operation.to_string(),
        cause: format!("API returned status: {status} - {body}"),
    }
}

/// Extracts JSON from an LLM response, handling markdown code fences.
///
/// Handles, in order:
///
/// 1. Fenced blocks with a `json` language marker
/// 2. Fenced blocks without a marker
/// 3. Raw JSON substrings (earliest of `{`/`[` to the matching last
///    `}`/`]`)
///
/// Returns the trimmed input if no JSON-looking region is found.
#[must_use]
pub fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    // Handle ```json ... ``` blocks
    if let Some((json_start, end)) = trimmed.find("```json").and_then(|start| {
        let json_start = start + 7;
        trimmed[json_start..]
            .find("```")
            .map(|end| (json_start, end))
    }) {
        return trimmed[json_start..json_start + end].trim();
    }

    // Handle ``` ... ``` blocks (without json marker)
    if let Some((json_start, end)) = trimmed.find("```").and_then(|start| {
        let content_start = start + 3;
        let after_marker = &trimmed[content_start..];
        let json_start = after_marker
            .find(['{', '['])
            .map_or(content_start, |pos| content_start + pos);
        trimmed[json_start..]
            .find("```")
            .map(|end| (json_start, end))
    }) {
        return trimmed[json_start..json_start + end].trim();
    }

    // Raw JSON: whichever of array/object starts first wins.
    let object = trimmed.find('{').zip(trimmed.rfind('}'));
    let array = trimmed.find('[').zip(trimmed.rfind(']'));
    let region = match (object, array) {
        (Some(obj), Some(arr)) => Some(if arr.0 < obj.0 { arr } else { obj }),
        (Some(obj), None) => Some(obj),
        (None, Some(arr)) => Some(arr),
        (None, None) => None,
    };
    if let Some((start, end)) = region {
        if end >= start {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

/// Unwraps a parsed payload into a list of candidate objects.
///
/// Arrays pass through; objects are searched for a list under the known
/// wrapper keys, falling back to a single-item list. Scalars yield
/// nothing.
#[must_use]
pub fn items_from_value(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            for key in WRAPPER_KEYS {
                if let Some(Value::Array(items)) = map.get(key) {
                    return items.clone();
                }
            }
            vec![Value::Object(map)]
        },
        _ => Vec::new(),
    }
}

/// Parses a raw LLM response into candidate objects.
///
/// Applies fence stripping and substring recovery before parsing.
///
/// # Errors
///
/// Returns [`Error::Parse`] when no JSON can be recovered.
pub fn parse_items(response: &str, operation: &str) -> Result<Vec<Value>> {
    if response.trim().is_empty() {
        return Ok(Vec::new());
    }
    let json_str = extract_json_from_response(response);
    let value: Value = serde_json::from_str(json_str).map_err(|e| Error::Parse {
        operation: operation.to_string(),
        cause: format!("{e}; response was: {}", truncate_for_log(response)),
    })?;
    Ok(items_from_value(value))
}

/// Normalizes candidate objects into validated triples.
///
/// Candidates wrapped in a grounded-extraction shape (an `attributes`
/// object) are unwrapped first. Candidates that fail validation are
/// logged and skipped.
#[must_use]
pub fn triples_from_items(items: Vec<Value>, operation: &str) -> Vec<Triple> {
    let mut triples = Vec::with_capacity(items.len());
    for item in items {
        let candidate = match &item {
            Value::Object(map) if map.get("attributes").is_some_and(Value::is_object) => {
                map["attributes"].clone()
            },
            _ => item,
        };

        let raw: RawTriple = match serde_json::from_value(candidate) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(operation = operation, error = %e, "Skipping unparseable candidate");
                continue;
            },
        };
        match Triple::try_from(raw) {
            Ok(triple) => triples.push(triple),
            Err(e) => {
                tracing::warn!(operation = operation, error = %e, "Skipping invalid triple");
            },
        }
    }
    triples
}

/// Renders few-shot exemplars as a prompt section.
#[must_use]
pub fn render_examples(examples: &[ExampleRecord]) -> String {
    let mut sections = Vec::with_capacity(examples.len());
    for (i, example) in examples.iter().enumerate() {
        let n = i + 1;
        match example {
            ExampleRecord::Extraction(ex) => {
                let extractions =
                    serde_json::to_string_pretty(&ex.extractions).unwrap_or_default();
                sections.push(format!(
                    "Example {n} input:\n{}\n\nExample {n} extractions:\n{extractions}",
                    ex.text
                ));
            },
            ExampleRecord::Augmentation(ex) => {
                let input = serde_json::to_string_pretty(&ex.input).unwrap_or_default();
                let output = serde_json::to_string_pretty(&ex.output).unwrap_or_default();
                sections.push(format!(
                    "Example {n} input:\n{input}\n\nExample {n} output:\n{output}"
                ));
            },
        }
    }
    sections.join("\n\n")
}

/// Assembles the full prompt sent to a provider.
///
/// When `fenced` is set (providers without native structured output),
/// the prompt ends with an instruction to answer with bare JSON; the
/// parser still tolerates fences.
#[must_use]
pub fn assemble_prompt(
    prompt_description: &str,
    schema_hint: &Value,
    examples: &[ExampleRecord],
    text: &str,
    fenced: bool,
) -> String {
    let schema = serde_json::to_string_pretty(schema_hint).unwrap_or_default();
    let mut prompt = format!(
        "{prompt_description}\n\n\
         Return the results as a JSON array of objects matching this JSON schema:\n{schema}"
    );
    if !examples.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&render_examples(examples));
    }
    prompt.push_str("\n\nInput Text:\n");
    prompt.push_str(text);
    if fenced {
        prompt.push_str(
            "\n\nIMPORTANT: Respond with ONLY a valid JSON array. \
             No explanation, just the JSON array starting with [ and ending with ].",
        );
    }
    prompt
}

const MAX_LOGGED_RESPONSE_CHARS: usize = 500;

fn truncate_for_log(response: &str) -> String {
    if response.chars().count() > MAX_LOGGED_RESPONSE_CHARS {
        let truncated: String = response.chars().take(MAX_LOGGED_RESPONSE_CHARS).collect();
        format!("{truncated}...(truncated)")
    } else {
        response.to_string()
    }
}
