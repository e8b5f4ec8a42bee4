//! Knowledge graph construction engines.
//!
//! - [`extraction`]: converts a text record into an initial triple set
//!   through a domain's prompt and exemplars.
//! - [`augmentation`]: iteratively refines the triple graph via
//!   registered strategies (the crate ships `connectivity`).

pub mod augmentation;
pub mod extraction;

pub use augmentation::{
    AugmentationMetadata, AugmentationRequest, AugmentationStrategy, IterationRecord,
    IterationStatus, StrategyContext, StrategyOutcome, extract_connected_graph, list_strategies,
    register_strategy,
};
pub use extraction::{ExtractionRequest, extract_from_record, extract_from_text};
