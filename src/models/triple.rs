//! Canonical knowledge graph triple.
//!
//! A [`Triple`] is immutable once constructed: head, relation, and tail
//! are trimmed and must be non-empty, and construction is the only way
//! to obtain one. Deserialization funnels through the permissive
//! [`RawTriple`] bridge so every triple in the system has passed the
//! same validation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// How a triple is supported by the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceType {
    /// Directly supported by a text span.
    #[default]
    Explicit,
    /// Inferred from context (always the case for augmented triples).
    Contextual,
}

impl InferenceType {
    /// Returns the inference type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Contextual => "contextual",
        }
    }

    /// Parses an inference type from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "explicit" => Some(Self::Explicit),
            "contextual" => Some(Self::Contextual),
            _ => None,
        }
    }
}

impl fmt::Display for InferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InferenceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown inference type: {s}"))
    }
}

/// A single knowledge graph triple.
///
/// Head, relation, and tail are trimmed on construction and guaranteed
/// non-empty. Two triples are equal iff head, relation, tail, and
/// inference are all equal; the justification is metadata and takes no
/// part in equality, hashing, or deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTriple")]
pub struct Triple {
    head: String,
    relation: String,
    tail: String,
    inference: InferenceType,
    justification: Option<String>,
}

impl Triple {
    /// Creates a validated triple.
    ///
    /// Head, relation, and tail are trimmed before storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTriple`] if any of head, relation, or
    /// tail is empty after trimming.
    pub fn new(
        head: impl Into<String>,
        relation: impl Into<String>,
        tail: impl Into<String>,
        inference: InferenceType,
    ) -> Result<Self> {
        let head = head.into().trim().to_string();
        let relation = relation.into().trim().to_string();
        let tail = tail.into().trim().to_string();

        for (field, value) in [("head", &head), ("relation", &relation), ("tail", &tail)] {
            if value.is_empty() {
                return Err(Error::InvalidTriple(format!("{field} cannot be empty")));
            }
        }

        Ok(Self {
            head,
            relation,
            tail,
            inference,
            justification: None,
        })
    }

    /// Attaches a justification (recommended for contextual triples).
    #[must_use]
    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }

    /// The source entity.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.head
    }

    /// The relationship connecting head to tail.
    #[must_use]
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// The target entity.
    #[must_use]
    pub fn tail(&self) -> &str {
        &self.tail
    }

    /// The inference tag.
    #[must_use]
    pub const fn inference(&self) -> InferenceType {
        self.inference
    }

    /// The justification, if any.
    #[must_use]
    pub fn justification(&self) -> Option<&str> {
        self.justification.as_deref()
    }

    /// The deduplication key.
    ///
    /// Inference is intentionally excluded so an augmenter cannot
    /// re-introduce an explicit triple under a contextual label.
    #[must_use]
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.head, &self.relation, &self.tail)
    }

    /// Returns a copy of this triple re-tagged with the given inference.
    #[must_use]
    pub fn with_inference(mut self, inference: InferenceType) -> Self {
        self.inference = inference;
        self
    }
}

impl PartialEq for Triple {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head
            && self.relation == other.relation
            && self.tail == other.tail
            && self.inference == other.inference
    }
}

impl Eq for Triple {}

impl Hash for Triple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.head.hash(state);
        self.relation.hash(state);
        self.tail.hash(state);
        self.inference.hash(state);
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.head, self.relation, self.tail)
    }
}

/// Permissive wire shape for triples.
///
/// Providers and exemplar files deserialize into this shape first;
/// [`Triple::try_from`] applies validation. Unknown inference strings
/// and empty fields are rejected there, so a successfully converted
/// triple is always valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTriple {
    /// The source entity (may be empty; rejected on conversion).
    #[serde(default)]
    pub head: String,
    /// The relationship (may be empty; rejected on conversion).
    #[serde(default)]
    pub relation: String,
    /// The target entity (may be empty; rejected on conversion).
    #[serde(default)]
    pub tail: String,
    /// The inference tag as a string; defaults to `explicit`.
    #[serde(default = "default_inference")]
    pub inference: String,
    /// Optional justification.
    #[serde(default)]
    pub justification: Option<String>,
}

fn default_inference() -> String {
    "explicit".to_string()
}

impl TryFrom<RawTriple> for Triple {
    type Error = Error;

    fn try_from(raw: RawTriple) -> Result<Self> {
        let inference = InferenceType::parse(&raw.inference).ok_or_else(|| {
            Error::InvalidTriple(format!("unknown inference type '{}'", raw.inference))
        })?;
        let triple = Self::new(raw.head, raw.relation, raw.tail, inference)?;
        Ok(match raw.justification {
            Some(j) if !j.trim().is_empty() => triple.with_justification(j),
            _ => triple,
        })
    }
}

impl From<&Triple> for RawTriple {
    fn from(triple: &Triple) -> Self {
        Self {
            head: triple.head.clone(),
            relation: triple.relation.clone(),
            tail: triple.tail.clone(),
            inference: triple.inference.as_str().to_string(),
            justification: triple.justification.clone(),
        }
    }
}

/// Removes duplicate triples by the `(head, relation, tail)` key,
/// preserving the first occurrence.
///
/// Because initial-extraction triples precede augmentation triples, an
/// explicit triple always survives a later contextual duplicate.
#[must_use]
pub fn dedupe_triples(triples: Vec<Triple>) -> Vec<Triple> {
    let mut seen: HashSet<(String, String, String)> = HashSet::with_capacity(triples.len());
    triples
        .into_iter()
        .filter(|t| {
            seen.insert((
                t.head().to_string(),
                t.relation().to_string(),
                t.tail().to_string(),
            ))
        })
        .collect()
}

/// JSON schema describing the triple object shape.
///
/// Passed to providers as the structured-output hint.
#[must_use]
pub fn triple_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "head": {
                "type": "string",
                "description": "The source entity in the relationship"
            },
            "relation": {
                "type": "string",
                "description": "The relationship type connecting head to tail (e.g. works_at, is_type, represents)"
            },
            "tail": {
                "type": "string",
                "description": "The target entity in the relationship"
            },
            "inference": {
                "type": "string",
                "enum": ["explicit", "contextual"],
                "description": "'explicit' if directly stated, 'contextual' if inferred"
            },
            "justification": {
                "type": "string",
                "description": "Brief explanation for contextual triples"
            }
        },
        "required": ["head", "relation", "tail"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_triple_trims_fields() {
        let t = Triple::new(" A ", " r ", " B ", InferenceType::Explicit).unwrap();
        assert_eq!(t.head(), "A");
        assert_eq!(t.relation(), "r");
        assert_eq!(t.tail(), "B");
    }

    #[test_case("", "r", "B" ; "empty head")]
    #[test_case("A", "  ", "B" ; "blank relation")]
    #[test_case("A", "r", "" ; "empty tail")]
    fn test_triple_rejects_empty(head: &str, relation: &str, tail: &str) {
        let result = Triple::new(head, relation, tail, InferenceType::Explicit);
        assert!(matches!(result, Err(Error::InvalidTriple(_))));
    }

    #[test]
    fn test_equality_ignores_justification() {
        let a = Triple::new("A", "r", "B", InferenceType::Explicit).unwrap();
        let b = Triple::new("A", "r", "B", InferenceType::Explicit)
            .unwrap()
            .with_justification("because");
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_includes_inference() {
        let a = Triple::new("A", "r", "B", InferenceType::Explicit).unwrap();
        let b = Triple::new("A", "r", "B", InferenceType::Contextual).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_whitespace_insensitive_after_trim() {
        let a = Triple::new(" A ", "r", "B", InferenceType::Explicit).unwrap();
        let b = Triple::new("A", "r", "B", InferenceType::Explicit).unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_key_is_case_sensitive() {
        let a = Triple::new("A", "r", "B", InferenceType::Explicit).unwrap();
        let b = Triple::new("a", "r", "B", InferenceType::Explicit).unwrap();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_raw_triple_defaults_to_explicit() {
        let raw: RawTriple = serde_json::from_str(
            r#"{"head": "A", "relation": "r", "tail": "B"}"#,
        )
        .unwrap();
        let triple = Triple::try_from(raw).unwrap();
        assert_eq!(triple.inference(), InferenceType::Explicit);
    }

    #[test]
    fn test_raw_triple_rejects_unknown_inference() {
        let raw = RawTriple {
            head: "A".to_string(),
            relation: "r".to_string(),
            tail: "B".to_string(),
            inference: "speculative".to_string(),
            justification: None,
        };
        assert!(Triple::try_from(raw).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let original = Triple::new("A", "r", "B", InferenceType::Contextual)
            .unwrap()
            .with_justification("bridges two components");
        let json = serde_json::to_string(&original).unwrap();
        let parsed: Triple = serde_json::from_str(&json).unwrap();
        assert_eq!(original, parsed);
        assert_eq!(parsed.justification(), Some("bridges two components"));
    }

    #[test]
    fn test_output_shape_has_null_justification() {
        let t = Triple::new("A", "r", "B", InferenceType::Explicit).unwrap();
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["justification"], serde_json::Value::Null);
        assert_eq!(value["inference"], "explicit");
    }

    #[test]
    fn test_dedupe_preserves_first_occurrence() {
        let explicit = Triple::new("A", "r", "B", InferenceType::Explicit).unwrap();
        let contextual = Triple::new("A", "r", "B", InferenceType::Contextual).unwrap();
        let other = Triple::new("C", "r2", "D", InferenceType::Explicit).unwrap();

        let deduped = dedupe_triples(vec![explicit.clone(), other.clone(), contextual]);
        assert_eq!(deduped, vec![explicit, other]);
        assert_eq!(deduped[0].inference(), InferenceType::Explicit);
    }

    #[test_case("explicit", Some(InferenceType::Explicit); "lowercase")]
    #[test_case("Contextual", Some(InferenceType::Contextual); "mixed_case")]
    #[test_case(" EXPLICIT ", Some(InferenceType::Explicit); "uppercase_with_whitespace")]
    #[test_case("speculative", None; "unknown")]
    fn test_inference_parse(input: &str, expected: Option<InferenceType>) {
        assert_eq!(InferenceType::parse(input), expected);
    }

    #[test]
    fn test_triple_schema_shape() {
        let schema = triple_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["head"].is_object());
        assert_eq!(schema["required"][0], "head");
    }
}
