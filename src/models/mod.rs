//! Data model for knowledge graph construction.
//!
//! The canonical record is the [`Triple`]: a validated, immutable
//! `(head, relation, tail)` with an inference tag. Few-shot exemplars,
//! grounded extractions, and domain schemas live in [`example`].

pub mod example;
pub mod triple;

pub use example::{
    AugmentationExample, AugmentationInput, Component, DomainSchema, ExampleRecord, Extraction,
    ExtractionExample,
};
pub use triple::{InferenceType, RawTriple, Triple, dedupe_triples, triple_schema};
