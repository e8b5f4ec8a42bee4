//! Knowledge domains: bundles of prompts, exemplars, and schemas.
//!
//! A domain specializes the engines for a subject area. On disk a domain
//! is a directory:
//!
//! ```text
//! <domain>/
//!   extraction/
//!     prompt_open.txt
//!     prompt_constrained.txt
//!     examples.json          (optional)
//!   augmentation/
//!     <strategy>/
//!       prompt.txt
//!       examples.json        (optional)
//!   schema.json              (optional)
//! ```
//!
//! Two domains ship embedded in the crate: `default` (general purpose)
//! and `legal` (court cases and proceedings). User domains load the same
//! layout from disk via [`KnowledgeDomain::from_dir`].
//!
//! Prompts and exemplars are loaded on first access per component and
//! cached for the domain's lifetime.

mod registry;

pub use registry::{DomainConstructor, get_domain, list_domains, register_domain};

use crate::models::{DomainSchema, ExampleRecord};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Mode for graph extraction.
///
/// Selects which extraction prompt a domain serves. Constrained mode
/// pairs the stricter prompt with the domain schema; type membership is
/// advisory and never enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Open vocabulary extraction.
    #[default]
    Open,
    /// Schema-guided extraction.
    Constrained,
}

impl ExtractionMode {
    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Constrained => "constrained",
        }
    }

    /// Parses a mode from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "constrained" => Some(Self::Constrained),
            _ => None,
        }
    }

    /// The extraction prompt file name for this mode.
    #[must_use]
    pub const fn prompt_file(&self) -> &'static str {
        match self {
            Self::Open => "prompt_open.txt",
            Self::Constrained => "prompt_constrained.txt",
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown extraction mode: {s}"))
    }
}

/// Where a resource's bytes come from.
#[derive(Debug, Clone)]
enum ResourceSource {
    /// A file on disk.
    File(PathBuf),
    /// A string compiled into the crate.
    Embedded {
        label: &'static str,
        content: &'static str,
    },
    /// No resource configured (valid only for optional resources).
    Absent,
}

impl ResourceSource {
    fn describe(&self) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Embedded { label, .. } => PathBuf::from(format!("embedded:{label}")),
            Self::Absent => PathBuf::from("<absent>"),
        }
    }
}

/// Prompt and exemplars for one domain activity (extraction, or one
/// augmentation strategy).
///
/// Resources load lazily on first access and stay cached.
#[derive(Debug)]
pub struct DomainComponent {
    prompt_source: ResourceSource,
    examples_source: ResourceSource,
    prompt: OnceLock<String>,
    examples: OnceLock<Vec<ExampleRecord>>,
}

impl DomainComponent {
    /// Creates a file-backed component.
    ///
    /// The prompt file is required (surfaced on first access); the
    /// examples file is optional.
    #[must_use]
    pub fn from_files(prompt_path: PathBuf, examples_path: PathBuf) -> Self {
        Self {
            prompt_source: ResourceSource::File(prompt_path),
            examples_source: ResourceSource::File(examples_path),
            prompt: OnceLock::new(),
            examples: OnceLock::new(),
        }
    }

    /// Creates a component from embedded resources.
    #[must_use]
    pub fn from_embedded(
        label: &'static str,
        prompt: &'static str,
        examples_json: Option<&'static str>,
    ) -> Self {
        Self {
            prompt_source: ResourceSource::Embedded {
                label,
                content: prompt,
            },
            examples_source: examples_json.map_or(ResourceSource::Absent, |content| {
                ResourceSource::Embedded { label, content }
            }),
            prompt: OnceLock::new(),
            examples: OnceLock::new(),
        }
    }

    /// The prompt template for this component.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] if the prompt file is missing.
    pub fn prompt(&self) -> Result<&str> {
        if let Some(prompt) = self.prompt.get() {
            return Ok(prompt);
        }

        let loaded = match &self.prompt_source {
            ResourceSource::File(path) => std::fs::read_to_string(path)
                .map_err(|_| Error::ResourceNotFound { path: path.clone() })?
                .trim()
                .to_string(),
            ResourceSource::Embedded { content, .. } => content.trim().to_string(),
            ResourceSource::Absent => {
                return Err(Error::ResourceNotFound {
                    path: self.prompt_source.describe(),
                });
            },
        };

        Ok(self.prompt.get_or_init(|| loaded))
    }

    /// The exemplar list for this component.
    ///
    /// An absent examples file yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResource`] if the file exists but fails
    /// to parse.
    pub fn examples(&self) -> Result<&[ExampleRecord]> {
        if let Some(examples) = self.examples.get() {
            return Ok(examples);
        }

        let loaded = match &self.examples_source {
            ResourceSource::File(path) => match std::fs::read_to_string(path) {
                Ok(raw) => parse_examples(&raw, || path.clone())?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(e) => {
                    return Err(Error::InvalidResource {
                        path: path.clone(),
                        cause: e.to_string(),
                    });
                },
            },
            ResourceSource::Embedded { content, .. } => {
                parse_examples(content, || self.examples_source.describe())?
            },
            ResourceSource::Absent => Vec::new(),
        };

        Ok(self.examples.get_or_init(|| loaded))
    }
}

fn parse_examples(raw: &str, path: impl Fn() -> PathBuf) -> Result<Vec<ExampleRecord>> {
    serde_json::from_str(raw).map_err(|e| Error::InvalidResource {
        path: path(),
        cause: e.to_string(),
    })
}

/// A knowledge domain: extraction resources selected by mode, named
/// augmentation strategies, and an optional advisory schema.
///
/// Effectively immutable during use; resource caches fill on first
/// access only.
#[derive(Debug)]
pub struct KnowledgeDomain {
    name: String,
    mode: ExtractionMode,
    extraction: DomainComponent,
    augmentations: BTreeMap<String, DomainComponent>,
    schema_source: ResourceSource,
    schema: OnceLock<DomainSchema>,
}

impl KnowledgeDomain {
    /// Loads a domain from a directory following the standard layout.
    ///
    /// Every subdirectory of `<root>/augmentation/` becomes a named
    /// strategy. Resource files themselves load lazily; a missing
    /// required prompt surfaces on first access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] if the domain root does not
    /// exist.
    pub fn from_dir(
        name: impl Into<String>,
        root: impl AsRef<Path>,
        mode: ExtractionMode,
    ) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::ResourceNotFound {
                path: root.to_path_buf(),
            });
        }

        let extraction_dir = root.join("extraction");
        let extraction = DomainComponent::from_files(
            extraction_dir.join(mode.prompt_file()),
            extraction_dir.join("examples.json"),
        );

        let mut augmentations = BTreeMap::new();
        let augmentation_dir = root.join("augmentation");
        if let Ok(entries) = std::fs::read_dir(&augmentation_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let Some(strategy) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                augmentations.insert(
                    strategy.to_string(),
                    DomainComponent::from_files(
                        path.join("prompt.txt"),
                        path.join("examples.json"),
                    ),
                );
            }
        }

        Ok(Self {
            name: name.into(),
            mode,
            extraction,
            augmentations,
            schema_source: ResourceSource::File(root.join("schema.json")),
            schema: OnceLock::new(),
        })
    }

    /// Builds a domain from embedded resources.
    #[must_use]
    pub fn from_embedded(spec: &EmbeddedDomain, mode: ExtractionMode) -> Self {
        let prompt = match mode {
            ExtractionMode::Open => spec.prompt_open,
            ExtractionMode::Constrained => spec.prompt_constrained,
        };
        let extraction =
            DomainComponent::from_embedded(spec.name, prompt, spec.extraction_examples);

        let augmentations = spec
            .augmentations
            .iter()
            .copied()
            .map(|(strategy, prompt, examples)| {
                (
                    strategy.to_string(),
                    DomainComponent::from_embedded(spec.name, prompt, examples),
                )
            })
            .collect();

        Self {
            name: spec.name.to_string(),
            mode,
            extraction,
            augmentations,
            schema_source: spec.schema.map_or(ResourceSource::Absent, |content| {
                ResourceSource::Embedded {
                    label: spec.name,
                    content,
                }
            }),
            schema: OnceLock::new(),
        }
    }

    /// The domain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The extraction mode this domain was instantiated with.
    #[must_use]
    pub const fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// The extraction component (prompt + exemplars).
    #[must_use]
    pub const fn extraction(&self) -> &DomainComponent {
        &self.extraction
    }

    /// The augmentation component for a named strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStrategy`] if the domain carries no
    /// resources for `strategy`.
    pub fn augmentation(&self, strategy: &str) -> Result<&DomainComponent> {
        self.augmentations
            .get(strategy)
            .ok_or_else(|| Error::UnknownStrategy {
                name: strategy.to_string(),
                available: self
                    .augmentations
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// The strategy names this domain carries resources for.
    #[must_use]
    pub fn augmentation_strategies(&self) -> Vec<String> {
        self.augmentations.keys().cloned().collect()
    }

    /// The advisory schema. Empty when the domain has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResource`] if a schema file exists but
    /// fails to parse.
    pub fn schema(&self) -> Result<&DomainSchema> {
        if let Some(schema) = self.schema.get() {
            return Ok(schema);
        }

        let loaded = match &self.schema_source {
            ResourceSource::File(path) => match std::fs::read_to_string(path) {
                Ok(raw) => serde_json::from_str(&raw).map_err(|e| Error::InvalidResource {
                    path: path.clone(),
                    cause: e.to_string(),
                })?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => DomainSchema::default(),
                Err(e) => {
                    return Err(Error::InvalidResource {
                        path: path.clone(),
                        cause: e.to_string(),
                    });
                },
            },
            ResourceSource::Embedded { content, .. } => serde_json::from_str(content)
                .map_err(|e| Error::InvalidResource {
                    path: self.schema_source.describe(),
                    cause: e.to_string(),
                })?,
            ResourceSource::Absent => DomainSchema::default(),
        };

        Ok(self.schema.get_or_init(|| loaded))
    }
}

/// Resources for a domain compiled into the crate.
///
/// Augmentations are `(strategy name, prompt, examples JSON)` entries.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedDomain {
    /// Domain name.
    pub name: &'static str,
    /// Open-mode extraction prompt.
    pub prompt_open: &'static str,
    /// Constrained-mode extraction prompt.
    pub prompt_constrained: &'static str,
    /// Extraction exemplars (JSON list), if any.
    pub extraction_examples: Option<&'static str>,
    /// Augmentation strategies: name, prompt, exemplars.
    pub augmentations: &'static [(&'static str, &'static str, Option<&'static str>)],
    /// Advisory schema JSON, if any.
    pub schema: Option<&'static str>,
}

/// The built-in general-purpose domain.
pub const DEFAULT_DOMAIN: EmbeddedDomain = EmbeddedDomain {
    name: "default",
    prompt_open: include_str!("../../resources/default/extraction/prompt_open.txt"),
    prompt_constrained: include_str!("../../resources/default/extraction/prompt_constrained.txt"),
    extraction_examples: Some(include_str!("../../resources/default/extraction/examples.json")),
    augmentations: &[(
        "connectivity",
        include_str!("../../resources/default/augmentation/connectivity/prompt.txt"),
        Some(include_str!(
            "../../resources/default/augmentation/connectivity/examples.json"
        )),
    )],
    schema: None,
};

/// The built-in legal domain (court cases and proceedings).
pub const LEGAL_DOMAIN: EmbeddedDomain = EmbeddedDomain {
    name: "legal",
    prompt_open: include_str!("../../resources/legal/extraction/prompt_open.txt"),
    prompt_constrained: include_str!("../../resources/legal/extraction/prompt_constrained.txt"),
    extraction_examples: Some(include_str!("../../resources/legal/extraction/examples.json")),
    augmentations: &[(
        "connectivity",
        include_str!("../../resources/legal/augmentation/connectivity/prompt.txt"),
        Some(include_str!(
            "../../resources/legal/augmentation/connectivity/examples.json"
        )),
    )],
    schema: Some(include_str!("../../resources/legal/schema.json")),
};

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("open", Some(ExtractionMode::Open))]
    #[test_case("Constrained", Some(ExtractionMode::Constrained))]
    #[test_case("strict", None)]
    fn test_mode_parse(input: &str, expected: Option<ExtractionMode>) {
        assert_eq!(ExtractionMode::parse(input), expected);
    }

    #[test]
    fn test_embedded_default_domain_loads() {
        let domain = KnowledgeDomain::from_embedded(&DEFAULT_DOMAIN, ExtractionMode::Open);
        assert_eq!(domain.name(), "default");

        let prompt = domain.extraction().prompt().unwrap();
        assert!(prompt.contains("{{record_json}}"));

        let examples = domain.extraction().examples().unwrap();
        assert!(!examples.is_empty());

        assert_eq!(domain.augmentation_strategies(), vec!["connectivity"]);
        assert!(domain.schema().unwrap().is_empty());
    }

    #[test]
    fn test_embedded_legal_domain_has_schema() {
        let domain = KnowledgeDomain::from_embedded(&LEGAL_DOMAIN, ExtractionMode::Constrained);
        let schema = domain.schema().unwrap();
        assert!(schema.relation_types.contains(&"represents".to_string()));

        let prompt = domain.extraction().prompt().unwrap();
        assert!(prompt.contains("{{record_json}}"));
    }

    #[test]
    fn test_mode_selects_prompt() {
        let open = KnowledgeDomain::from_embedded(&DEFAULT_DOMAIN, ExtractionMode::Open);
        let constrained =
            KnowledgeDomain::from_embedded(&DEFAULT_DOMAIN, ExtractionMode::Constrained);
        assert_ne!(
            open.extraction().prompt().unwrap(),
            constrained.extraction().prompt().unwrap()
        );
    }

    #[test]
    fn test_unknown_strategy_lists_available() {
        let domain = KnowledgeDomain::from_embedded(&DEFAULT_DOMAIN, ExtractionMode::Open);
        let err = domain.augmentation("centrality").unwrap_err();
        match err {
            Error::UnknownStrategy { name, available } => {
                assert_eq!(name, "centrality");
                assert!(available.contains("connectivity"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_dir_missing_root() {
        let err =
            KnowledgeDomain::from_dir("nope", "/nonexistent/domain", ExtractionMode::Open)
                .unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound { .. }));
    }

    #[test]
    fn test_missing_prompt_surfaces_lazily() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("extraction")).unwrap();

        let domain =
            KnowledgeDomain::from_dir("sparse", dir.path(), ExtractionMode::Open).unwrap();
        let err = domain.extraction().prompt().unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound { .. }));
    }

    #[test]
    fn test_malformed_examples_surface() {
        let dir = tempfile::tempdir().unwrap();
        let extraction = dir.path().join("extraction");
        std::fs::create_dir_all(&extraction).unwrap();
        std::fs::write(extraction.join("prompt_open.txt"), "{{record_json}}").unwrap();
        std::fs::write(extraction.join("examples.json"), "not json").unwrap();

        let domain =
            KnowledgeDomain::from_dir("broken", dir.path(), ExtractionMode::Open).unwrap();
        assert!(domain.extraction().prompt().is_ok());
        let err = domain.extraction().examples().unwrap_err();
        assert!(matches!(err, Error::InvalidResource { .. }));
    }

    #[test]
    fn test_from_dir_discovers_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let extraction = dir.path().join("extraction");
        std::fs::create_dir_all(&extraction).unwrap();
        std::fs::write(extraction.join("prompt_open.txt"), "{{record_json}}").unwrap();
        for strategy in ["connectivity", "density"] {
            let sdir = dir.path().join("augmentation").join(strategy);
            std::fs::create_dir_all(&sdir).unwrap();
            std::fs::write(sdir.join("prompt.txt"), "bridge the graph").unwrap();
        }

        let domain = KnowledgeDomain::from_dir("multi", dir.path(), ExtractionMode::Open).unwrap();
        assert_eq!(
            domain.augmentation_strategies(),
            vec!["connectivity", "density"]
        );
        // No examples file: empty list, not an error.
        assert!(
            domain
                .augmentation("density")
                .unwrap()
                .examples()
                .unwrap()
                .is_empty()
        );
    }
}
