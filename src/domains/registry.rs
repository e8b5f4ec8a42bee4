//! Registry for knowledge domains.
//!
//! Domains register a constructor under a name; callers resolve them
//! with [`get_domain`]. The built-in `default` and `legal` domains are
//! registered when the registry is first touched. The registry is
//! populated at startup and treated as read-only thereafter.

use super::{DEFAULT_DOMAIN, ExtractionMode, KnowledgeDomain, LEGAL_DOMAIN};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Constructor signature for a registered domain.
pub type DomainConstructor = fn(ExtractionMode) -> Result<KnowledgeDomain>;

static REGISTRY: LazyLock<RwLock<HashMap<String, DomainConstructor>>> = LazyLock::new(|| {
    let mut map: HashMap<String, DomainConstructor> = HashMap::new();
    map.insert("default".to_string(), builtin_default);
    map.insert("legal".to_string(), builtin_legal);
    RwLock::new(map)
});

fn builtin_default(mode: ExtractionMode) -> Result<KnowledgeDomain> {
    Ok(KnowledgeDomain::from_embedded(&DEFAULT_DOMAIN, mode))
}

fn builtin_legal(mode: ExtractionMode) -> Result<KnowledgeDomain> {
    Ok(KnowledgeDomain::from_embedded(&LEGAL_DOMAIN, mode))
}

/// Registers a domain constructor under a name.
///
/// Re-registering a name replaces the previous constructor.
pub fn register_domain(name: impl Into<String>, constructor: DomainConstructor) {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.into(), constructor);
}

/// Instantiates a registered domain by name.
///
/// # Errors
///
/// Returns [`Error::UnknownDomain`] (with the registered names) if the
/// name is not registered; constructor failures propagate.
pub fn get_domain(name: &str, mode: ExtractionMode) -> Result<KnowledgeDomain> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    let constructor = registry.get(name).ok_or_else(|| Error::UnknownDomain {
        name: name.to_string(),
        available: {
            let mut names: Vec<_> = registry.keys().cloned().collect();
            names.sort();
            names.join(", ")
        },
    })?;
    constructor(mode)
}

/// Lists all registered domain names, sorted.
#[must_use]
pub fn list_domains() -> Vec<String> {
    let mut names: Vec<_> = REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}
