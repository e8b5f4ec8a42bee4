//! Few-shot exemplar shapes and the advisory domain schema.
//!
//! Exemplar files (`examples.json`) hold a list of records in one of two
//! shapes, distinguished at parse time by their keys: extraction-style
//! (`text` + `extractions`) or augmentation-style (`input` + `output`).
//! Both shapes may appear in the same file.

use crate::models::Triple;
use serde::{Deserialize, Serialize};

/// A grounded extraction: a triple plus the text span supporting it.
///
/// `char_start`/`char_end` are `[start, end)` half-open positions into
/// the source text. They are absent for ungrounded outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// The verbatim span supporting the triple (may be empty when
    /// ungrounded).
    #[serde(default)]
    pub extraction_text: String,
    /// Start of the supporting span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_start: Option<usize>,
    /// End of the supporting span (exclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_end: Option<usize>,
    /// The embedded triple.
    pub attributes: Triple,
}

/// Few-shot exemplar for extraction: source text and the expected
/// grounded extractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionExample {
    /// The exemplar source text.
    pub text: String,
    /// The expected extractions.
    pub extractions: Vec<Extraction>,
}

/// A disconnected component, represented as a list of entity names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Entity names belonging to this component.
    pub entities: Vec<String>,
}

/// Structured input for an augmentation exemplar: the original text and
/// the components that need bridging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationInput {
    /// The exemplar source text.
    pub text: String,
    /// The disconnected components.
    pub components: Vec<Component>,
}

/// Few-shot exemplar for augmentation: structured input and the
/// expected bridging triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationExample {
    /// The bridging task input.
    pub input: AugmentationInput,
    /// The expected bridging triples.
    pub output: Vec<Triple>,
}

/// One record in an `examples.json` file.
///
/// The variant is decided by the keys present: `text`+`extractions`
/// selects [`ExampleRecord::Extraction`], `input`+`output` selects
/// [`ExampleRecord::Augmentation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExampleRecord {
    /// Extraction-style exemplar.
    Extraction(ExtractionExample),
    /// Augmentation-style exemplar.
    Augmentation(AugmentationExample),
}

/// Advisory schema of allowed entity and relation types for a domain.
///
/// Selected by constrained extraction mode; membership is never
/// enforced by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSchema {
    /// Allowed entity types.
    #[serde(default)]
    pub entity_types: Vec<String>,
    /// Allowed relation types.
    #[serde(default)]
    pub relation_types: Vec<String>,
}

impl DomainSchema {
    /// Returns true if the schema carries no type lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_types.is_empty() && self.relation_types.is_empty()
    }
}
