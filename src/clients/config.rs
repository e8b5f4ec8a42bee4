//! Client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for creating an LLM client.
///
/// This is a pure data container: no provider-specific logic is applied
/// here. Each client's `from_config` applies its own defaults for the
/// `None` fields, so user input survives as-is all the way to the
/// provider. Frozen after construction by convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Which registered provider to use.
    #[serde(default = "default_client_type")]
    pub client_type: String,
    /// Model identifier; `None` uses the provider's default.
    #[serde(default)]
    pub model_id: Option<String>,
    /// API key for hosted providers; `None` falls back to provider
    /// environment variables.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Server URL for local providers; `None` uses the provider's
    /// default.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
    /// Maximum parallel workers for chunked extraction; `None` uses the
    /// provider's default.
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// Maximum characters per chunk for long inputs.
    #[serde(default = "default_max_char_buffer")]
    pub max_char_buffer: usize,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Whether to emit progress logging during extraction.
    #[serde(default = "default_true")]
    pub show_progress: bool,
    /// Number of extraction passes (higher improves recall).
    #[serde(default = "default_extraction_passes")]
    pub extraction_passes: usize,
    /// Number of chunks per batch; `None` uses the provider's default.
    #[serde(default)]
    pub batch_length: Option<usize>,
}

fn default_client_type() -> String {
    "gemini".to_string()
}

const fn default_max_char_buffer() -> usize {
    8000
}

const fn default_timeout_seconds() -> u64 {
    120
}

const fn default_true() -> bool {
    true
}

const fn default_extraction_passes() -> usize {
    1
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_type: default_client_type(),
            model_id: None,
            api_key: None,
            base_url: None,
            temperature: 0.0,
            max_workers: None,
            max_char_buffer: default_max_char_buffer(),
            timeout_seconds: default_timeout_seconds(),
            show_progress: true,
            extraction_passes: default_extraction_passes(),
            batch_length: None,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given client type.
    #[must_use]
    pub fn new(client_type: impl Into<String>) -> Self {
        Self {
            client_type: client_type.into(),
            ..Self::default()
        }
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the server URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum parallel workers.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Sets the chunk size in characters.
    #[must_use]
    pub const fn with_max_char_buffer(mut self, max_char_buffer: usize) -> Self {
        self.max_char_buffer = max_char_buffer;
        self
    }

    /// Sets the per-request timeout in seconds.
    #[must_use]
    pub const fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Sets the number of extraction passes.
    #[must_use]
    pub const fn with_extraction_passes(mut self, extraction_passes: usize) -> Self {
        self.extraction_passes = extraction_passes;
        self
    }
}
