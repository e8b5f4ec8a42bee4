//! Augmentation strategies for iterative graph refinement.
//!
//! A strategy is a registered function that takes the current triple
//! set and returns an augmented one plus per-iteration records. The
//! crate ships one strategy, `connectivity`, which bridges weakly
//! connected components until the graph is connected enough or the
//! iteration budget runs out.
//!
//! New strategies register with [`register_strategy`]; the registry is
//! populated at startup and treated as read-only thereafter.

use super::extraction::{ExtractionRequest, extract_from_text};
use crate::clients::{ExtractRequest, GenerateRequest, LlmClient};
use crate::domains::{DomainComponent, KnowledgeDomain};
use crate::graph::graph_from_triples;
use crate::models::{InferenceType, RawTriple, Triple, dedupe_triples, triple_schema};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Instruction string sent alongside every bridging prompt.
pub(crate) const AUGMENTATION_PROMPT_DESCRIPTION: &str =
    "Extract augmentation triples to connect graph components. Infer relations if necessary.";

/// Components shown to the model per iteration.
const MAX_COMPONENTS_IN_PROMPT: usize = 30;

/// Node names shown per component.
const MAX_NODES_PER_COMPONENT: usize = 10;

/// Outcome of a single augmentation iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationStatus {
    /// The iteration completed and its triples were merged.
    Success,
    /// The provider call failed; the loop exited early.
    Failed,
}

/// Record of one augmentation iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Whether the iteration succeeded.
    pub status: IterationStatus,
    /// Weakly connected component count before the iteration.
    pub components_before: Option<usize>,
    /// Number of triples the iteration added (before deduplication).
    pub new_triples_count: Option<usize>,
    /// Provider error message for failed iterations.
    pub error: Option<String>,
}

/// Metadata returned alongside the augmented triple set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentationMetadata {
    /// The strategy that ran.
    pub strategy: String,
    /// Per-iteration records, in order.
    pub iterations: Vec<IterationRecord>,
    /// Weakly connected component count of the returned triples.
    pub final_components: usize,
    /// True when a provider failure cut the loop short; the returned
    /// triples are still valid and usable.
    pub partial_result: bool,
}

/// Parameters for connected-graph extraction.
#[derive(Debug, Clone)]
pub struct AugmentationRequest<'a> {
    /// The text to analyze.
    pub text: &'a str,
    /// Optional record identifier.
    pub record_id: Option<&'a str>,
    /// Already-extracted triples to augment. When set, no initial
    /// extraction call is made; elements are re-validated and invalid
    /// ones dropped with a warning.
    pub initial_triples: Option<&'a [Triple]>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate, if bounded.
    pub max_tokens: Option<u32>,
    /// Acceptable number of weakly connected components.
    pub max_disconnected: usize,
    /// Maximum refinement iterations.
    pub max_iterations: usize,
    /// The augmentation strategy to dispatch.
    pub strategy: &'a str,
    /// Extraction prompt override (initial extraction only).
    pub prompt_override: Option<&'a str>,
    /// Augmentation prompt override (replaces the strategy's template).
    pub augmentation_prompt_override: Option<&'a str>,
}

impl Default for AugmentationRequest<'_> {
    fn default() -> Self {
        Self {
            text: "",
            record_id: None,
            initial_triples: None,
            temperature: 0.0,
            max_tokens: None,
            max_disconnected: 3,
            max_iterations: 2,
            strategy: "connectivity",
            prompt_override: None,
            augmentation_prompt_override: None,
        }
    }
}

/// Everything a strategy needs for one run.
pub struct StrategyContext<'a> {
    /// The LLM client.
    pub client: &'a dyn LlmClient,
    /// The active domain.
    pub domain: &'a KnowledgeDomain,
    /// The strategy's resources (prompt + exemplars) from the domain.
    pub component: &'a DomainComponent,
    /// The original record text.
    pub text: &'a str,
    /// Optional record identifier, for logging.
    pub record_id: Option<&'a str>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate, if bounded.
    pub max_tokens: Option<u32>,
    /// Acceptable number of weakly connected components.
    pub max_disconnected: usize,
    /// Maximum refinement iterations.
    pub max_iterations: usize,
    /// Replaces the strategy's prompt template when set.
    pub prompt_override: Option<&'a str>,
}

/// What a strategy hands back to the engine.
#[derive(Debug)]
pub struct StrategyOutcome {
    /// The original triples plus everything the strategy appended, in
    /// order. Not yet deduplicated.
    pub triples: Vec<Triple>,
    /// Per-iteration records.
    pub iterations: Vec<IterationRecord>,
    /// True when a provider failure cut the loop short.
    pub partial_result: bool,
}

/// Strategy signature: consumes the starting triples, returns the
/// augmented set. Provider failures are captured in the outcome, never
/// raised.
pub type AugmentationStrategy = fn(&StrategyContext<'_>, Vec<Triple>) -> StrategyOutcome;

static STRATEGIES: LazyLock<RwLock<HashMap<String, AugmentationStrategy>>> =
    LazyLock::new(|| {
        let mut map: HashMap<String, AugmentationStrategy> = HashMap::new();
        map.insert("connectivity".to_string(), connectivity);
        RwLock::new(map)
    });

/// Registers an augmentation strategy under a name.
///
/// Re-registering a name replaces the previous strategy.
pub fn register_strategy(name: impl Into<String>, strategy: AugmentationStrategy) {
    STRATEGIES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.into(), strategy);
}

/// Looks up a registered strategy.
///
/// # Errors
///
/// Returns [`Error::UnknownStrategy`] with the registered names.
pub fn get_strategy(name: &str) -> Result<AugmentationStrategy> {
    let registry = STRATEGIES.read().unwrap_or_else(PoisonError::into_inner);
    registry
        .get(name)
        .copied()
        .ok_or_else(|| Error::UnknownStrategy {
            name: name.to_string(),
            available: {
                let mut names: Vec<_> = registry.keys().cloned().collect();
                names.sort();
                names.join(", ")
            },
        })
}

/// Lists all registered strategy names, sorted.
#[must_use]
pub fn list_strategies() -> Vec<String> {
    let mut names: Vec<_> = STRATEGIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

/// Extracts triples and iteratively augments them toward a connected
/// graph.
///
/// When `initial_triples` is provided no extraction call is made;
/// otherwise the extraction engine runs first and its errors surface.
/// The loop stops when the component count reaches
/// `max_disconnected`, the iteration budget runs out, or a provider
/// call fails — in the last case the accumulated triples are returned
/// with `partial_result = true`.
///
/// The returned triples are deduplicated by the 3-tuple key with the
/// first occurrence preserved, so an explicit triple always survives a
/// later contextual duplicate.
///
/// # Errors
///
/// Returns [`Error::UnknownStrategy`] for unregistered strategies, and
/// surfaces initial-extraction failures.
pub fn extract_connected_graph(
    client: &dyn LlmClient,
    domain: &KnowledgeDomain,
    request: &AugmentationRequest<'_>,
) -> Result<(Vec<Triple>, AugmentationMetadata)> {
    let strategy = get_strategy(request.strategy)?;
    let component = domain.augmentation(request.strategy)?;

    // Force the strategy's resources to load now: resource errors
    // surface to the caller, only provider failures are iteration-level.
    if request.augmentation_prompt_override.is_none() {
        component.prompt()?;
    }
    component.examples()?;

    let initial = match request.initial_triples {
        Some(triples) => revalidate_triples(triples),
        None => extract_from_text(
            client,
            domain,
            &ExtractionRequest {
                text: request.text,
                record_id: request.record_id,
                temperature: request.temperature,
                max_tokens: request.max_tokens,
                prompt_override: request.prompt_override,
            },
        )?,
    };

    let context = StrategyContext {
        client,
        domain,
        component,
        text: request.text,
        record_id: request.record_id,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        max_disconnected: request.max_disconnected,
        max_iterations: request.max_iterations,
        prompt_override: request.augmentation_prompt_override,
    };

    let outcome = strategy(&context, initial);
    let triples = dedupe_triples(outcome.triples);
    let final_components = graph_from_triples(&triples)
        .weakly_connected_components()
        .len();

    let metadata = AugmentationMetadata {
        strategy: request.strategy.to_string(),
        iterations: outcome.iterations,
        final_components,
        partial_result: outcome.partial_result,
    };

    tracing::debug!(
        strategy = %metadata.strategy,
        record_id = request.record_id.unwrap_or("<none>"),
        triples = triples.len(),
        final_components,
        partial = metadata.partial_result,
        "Augmentation complete"
    );

    Ok((triples, metadata))
}

/// Re-runs every triple through the constructor, dropping invalid ones
/// with a warning.
fn revalidate_triples(triples: &[Triple]) -> Vec<Triple> {
    triples
        .iter()
        .filter_map(|t| {
            match Triple::new(t.head(), t.relation(), t.tail(), t.inference()) {
                Ok(valid) => Some(match t.justification() {
                    Some(j) => valid.with_justification(j),
                    None => valid,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping invalid initial triple");
                    None
                },
            }
        })
        .collect()
}

/// Built-in connectivity strategy.
///
/// Per iteration: rebuild the graph, enumerate weakly connected
/// components, and if there are too many, ask the model for bridging
/// triples. Every added triple carries `inference = contextual`. The
/// original triples are never modified, only appended to.
fn connectivity(context: &StrategyContext<'_>, mut triples: Vec<Triple>) -> StrategyOutcome {
    let mut iterations = Vec::new();
    let mut partial_result = false;

    for iteration in 1..=context.max_iterations {
        let mut components = graph_from_triples(&triples).weakly_connected_components();
        components.sort_by_key(|c| std::cmp::Reverse(c.len()));
        let components_before = components.len();

        if components_before <= context.max_disconnected {
            break;
        }

        match bridge_components(context, &triples, &components) {
            Ok(new_triples) => {
                tracing::debug!(
                    strategy = "connectivity",
                    iteration,
                    components_before,
                    new_triples = new_triples.len(),
                    "Bridging iteration succeeded"
                );
                iterations.push(IterationRecord {
                    iteration,
                    status: IterationStatus::Success,
                    components_before: Some(components_before),
                    new_triples_count: Some(new_triples.len()),
                    error: None,
                });
                triples.extend(new_triples);
            },
            Err(e) => {
                tracing::warn!(
                    strategy = "connectivity",
                    iteration,
                    error = %e,
                    "Bridging iteration failed, returning partial result"
                );
                iterations.push(IterationRecord {
                    iteration,
                    status: IterationStatus::Failed,
                    components_before: Some(components_before),
                    new_triples_count: None,
                    error: Some(e.to_string()),
                });
                partial_result = true;
                break;
            },
        }
    }

    StrategyOutcome {
        triples,
        iterations,
        partial_result,
    }
}

/// Runs one bridging call and returns the validated contextual triples.
fn bridge_components(
    context: &StrategyContext<'_>,
    triples: &[Triple],
    components: &[Vec<String>],
) -> Result<Vec<Triple>> {
    let template = match context.prompt_override {
        Some(template) => template,
        None => context.component.prompt()?,
    };
    let listing = format_components(components);
    let triples_json = serde_json::to_string_pretty(triples).unwrap_or_default();
    let prompt = format!(
        "{template}\n\nOriginal Text:\n{}\n\nCurrent triples:\n{triples_json}\n\n\
         Disconnected components ({}):\n{listing}",
        context.text,
        components.len(),
    );

    let schema = triple_schema();
    let examples = context.component.examples()?;

    if context.client.supports_structured_output() {
        let extracted = context.client.extract(&ExtractRequest {
            text: &prompt,
            prompt_description: AUGMENTATION_PROMPT_DESCRIPTION,
            examples,
            schema_hint: &schema,
            temperature: context.temperature,
            max_tokens: context.max_tokens,
        })?;
        Ok(extracted
            .into_iter()
            .map(|t| t.with_inference(InferenceType::Contextual))
            .collect())
    } else {
        let items = context.client.generate_json(&GenerateRequest {
            text: &prompt,
            prompt_description: AUGMENTATION_PROMPT_DESCRIPTION,
            schema_hint: &schema,
            temperature: context.temperature,
            max_tokens: context.max_tokens,
        })?;
        Ok(contextual_triples_from_items(items))
    }
}

/// Forces `inference = contextual` on raw items and validates them,
/// skipping failures with a warning.
fn contextual_triples_from_items(items: Vec<Value>) -> Vec<Triple> {
    let mut triples = Vec::with_capacity(items.len());
    for item in items {
        let mut candidate = match &item {
            Value::Object(map) if map.get("attributes").is_some_and(Value::is_object) => {
                map["attributes"].clone()
            },
            _ => item,
        };
        if let Value::Object(map) = &mut candidate {
            map.insert(
                "inference".to_string(),
                Value::String("contextual".to_string()),
            );
        }

        let raw: RawTriple = match serde_json::from_value(candidate) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unparseable bridging candidate");
                continue;
            },
        };
        match Triple::try_from(raw) {
            Ok(triple) => triples.push(triple),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping invalid bridging triple");
            },
        }
    }
    triples
}

/// Formats disconnected components for the bridging prompt.
///
/// Shows up to 30 components with up to 10 node names each.
fn format_components(components: &[Vec<String>]) -> String {
    components
        .iter()
        .take(MAX_COMPONENTS_IN_PROMPT)
        .enumerate()
        .map(|(i, component)| {
            let mut node_str = component
                .iter()
                .take(MAX_NODES_PER_COMPONENT)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if component.len() > MAX_NODES_PER_COMPONENT {
                node_str.push_str(&format!(" ... ({} total nodes)", component.len()));
            }
            format!("Component {}: {node_str}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
