//! # Kgforge
//!
//! Knowledge graph construction from free-form text.
//!
//! Kgforge extracts `(head, relation, tail)` triples from text records by
//! orchestrating an LLM backend, then iteratively augments the triple set
//! to improve the structural connectivity of the resulting graph.
//!
//! ## Features
//!
//! - Provider-agnostic LLM interface with three built-in clients
//!   (Gemini hosted API, Ollama, LM Studio)
//! - Pluggable knowledge domains bundling prompts, few-shot exemplars,
//!   and optional type schemas (`default` and `legal` ship built in)
//! - Named augmentation strategies with a built-in `connectivity`
//!   strategy that bridges weakly connected components
//! - Validated, immutable triples with an explicit/contextual inference tag
//!
//! ## Example
//!
//! ```rust,ignore
//! use kgforge::builder::{extract_connected_graph, AugmentationRequest};
//! use kgforge::clients::{create_client, ClientConfig};
//! use kgforge::domains::{get_domain, ExtractionMode};
//!
//! let client = create_client(&ClientConfig::default())?;
//! let domain = get_domain("legal", ExtractionMode::Open)?;
//! let request = AugmentationRequest {
//!     text: "The claimant alleged breach of contract...",
//!     ..AugmentationRequest::default()
//! };
//! let (triples, metadata) = extract_connected_graph(client.as_ref(), &domain, &request)?;
//! println!("{} triples, {} components", triples.len(), metadata.final_components);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

// Module declarations
pub mod builder;
pub mod clients;
pub mod domains;
pub mod graph;
pub mod models;
pub mod observability;

// Re-exports for convenience
pub use builder::{
    AugmentationMetadata, AugmentationRequest, ExtractionRequest, IterationRecord,
    IterationStatus, extract_connected_graph, extract_from_record, extract_from_text,
};
pub use clients::{ClientConfig, LlmClient, create_client};
pub use domains::{ExtractionMode, KnowledgeDomain, get_domain, list_domains};
pub use graph::{TripleGraph, graph_from_triples};
pub use models::{InferenceType, Triple};

/// Error type for kgforge operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait
/// implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidTriple` | Empty head/relation/tail after trimming |
/// | `InvalidInput` | Missing record fields, missing API key, bad caller input |
/// | `UnknownDomain` | Domain name not registered |
/// | `UnknownStrategy` | Augmentation strategy not registered or absent from the domain |
/// | `UnsupportedClient` | Client type not registered |
/// | `ResourceNotFound` | Required prompt file missing |
/// | `InvalidResource` | Exemplar or schema file fails to parse |
/// | `Transport` | Network error, timeout, or non-2xx from a provider |
/// | `Parse` | Provider output unparseable after fence stripping and recovery |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A triple failed validation.
    ///
    /// Raised when any of head, relation, or tail is empty after
    /// trimming. During response normalization the candidate is dropped
    /// with a warning instead; this surfaces only on direct construction.
    #[error("invalid triple: {0}")]
    InvalidTriple(String),

    /// Invalid input was provided by the caller.
    ///
    /// Raised when:
    /// - A record is missing its text field
    /// - A hosted client has no API key in config or environment
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested domain is not registered.
    #[error("unknown domain '{name}'. Available: {available}")]
    UnknownDomain {
        /// The requested domain name.
        name: String,
        /// Comma-separated registered domain names.
        available: String,
    },

    /// The requested augmentation strategy is not registered, or the
    /// domain carries no resources for it.
    #[error("unknown augmentation strategy '{name}'. Available: {available}")]
    UnknownStrategy {
        /// The requested strategy name.
        name: String,
        /// Comma-separated available strategy names.
        available: String,
    },

    /// The requested client type is not registered.
    #[error("unsupported client type '{kind}'. Available: {available}")]
    UnsupportedClient {
        /// The requested client type.
        kind: String,
        /// Comma-separated registered client types.
        available: String,
    },

    /// A required domain resource file is missing.
    #[error("resource not found: {path}")]
    ResourceNotFound {
        /// Path of the missing file.
        path: PathBuf,
    },

    /// A domain resource file exists but fails to parse.
    #[error("invalid resource {path}: {cause}")]
    InvalidResource {
        /// Path of the malformed file.
        path: PathBuf,
        /// The underlying parse error.
        cause: String,
    },

    /// A provider request failed at the transport level.
    ///
    /// Raised on network errors, timeouts, and non-2xx responses. Not
    /// retried by the provider; the augmentation loop treats this as an
    /// iteration-level failure and returns partial results.
    #[error("provider transport error during '{operation}': {cause}")]
    Transport {
        /// The provider operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A provider response could not be parsed.
    ///
    /// Raised when the body is not JSON even after fence stripping and
    /// array/object substring recovery.
    #[error("provider parse error during '{operation}': {cause}")]
    Parse {
        /// The provider operation whose output failed to parse.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true for provider-side failures (transport or parse).
    ///
    /// The augmentation loop uses this to decide between surfacing an
    /// error and exiting early with partial results.
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Parse { .. })
    }
}

/// Result type alias for kgforge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidTriple("head cannot be empty".to_string());
        assert_eq!(err.to_string(), "invalid triple: head cannot be empty");

        let err = Error::UnknownDomain {
            name: "medical".to_string(),
            available: "default, legal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown domain 'medical'. Available: default, legal"
        );

        let err = Error::Transport {
            operation: "gemini_generate".to_string(),
            cause: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "provider transport error during 'gemini_generate': timeout"
        );
    }

    #[test]
    fn test_is_provider_error() {
        let transport = Error::Transport {
            operation: "x".to_string(),
            cause: "y".to_string(),
        };
        let parse = Error::Parse {
            operation: "x".to_string(),
            cause: "y".to_string(),
        };
        let other = Error::InvalidTriple("z".to_string());

        assert!(transport.is_provider_error());
        assert!(parse.is_provider_error());
        assert!(!other.is_provider_error());
    }
}
