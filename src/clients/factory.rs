//! Provider registry and client factory.
//!
//! Providers register a factory function under a type name; callers
//! resolve a client from a [`ClientConfig`] with [`create_client`]. The
//! built-in providers are registered when the registry is first
//! touched. Populated at startup, read-only thereafter.

use super::{ClientConfig, GeminiClient, LlmClient, LmStudioClient, OllamaClient};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Factory signature for a registered provider.
pub type ClientFactory = fn(&ClientConfig) -> Result<Box<dyn LlmClient>>;

static REGISTRY: LazyLock<RwLock<HashMap<String, ClientFactory>>> = LazyLock::new(|| {
    let mut map: HashMap<String, ClientFactory> = HashMap::new();
    map.insert("gemini".to_string(), gemini_factory);
    map.insert("ollama".to_string(), ollama_factory);
    map.insert("lmstudio".to_string(), lmstudio_factory);
    RwLock::new(map)
});

fn gemini_factory(config: &ClientConfig) -> Result<Box<dyn LlmClient>> {
    Ok(Box::new(GeminiClient::from_config(config)?))
}

fn ollama_factory(config: &ClientConfig) -> Result<Box<dyn LlmClient>> {
    Ok(Box::new(OllamaClient::from_config(config)))
}

fn lmstudio_factory(config: &ClientConfig) -> Result<Box<dyn LlmClient>> {
    Ok(Box::new(LmStudioClient::from_config(config)))
}

/// Registers a provider factory under a type name.
///
/// Re-registering a name replaces the previous factory.
pub fn register_client(client_type: impl Into<String>, factory: ClientFactory) {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(client_type.into(), factory);
}

/// Creates a client for `config.client_type`.
///
/// Provider-specific defaults are applied by the provider's
/// `from_config`, not here.
///
/// # Errors
///
/// Returns [`Error::UnsupportedClient`] (with the registered type
/// names) when the type is unknown; factory failures propagate.
pub fn create_client(config: &ClientConfig) -> Result<Box<dyn LlmClient>> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    let factory = registry
        .get(&config.client_type)
        .ok_or_else(|| Error::UnsupportedClient {
            kind: config.client_type.clone(),
            available: {
                let mut names: Vec<_> = registry.keys().cloned().collect();
                names.sort();
                names.join(", ")
            },
        })?;
    factory(config)
}

/// Lists all registered client types, sorted.
#[must_use]
pub fn list_client_types() -> Vec<String> {
    let mut names: Vec<_> = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}
