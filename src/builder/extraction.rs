//! Core extraction logic for converting text to triples.

use crate::clients::{ExtractRequest, LlmClient};
use crate::domains::KnowledgeDomain;
use crate::models::{Triple, triple_schema};
use crate::{Error, Result};
use serde_json::Value;

/// Instruction string sent alongside every extraction prompt.
pub(crate) const EXTRACTION_PROMPT_DESCRIPTION: &str =
    "Extract meaningful knowledge graph triples from the text, focusing on explicit \
     relationships between entities.";

/// Parameters for a single-record extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    /// The text to analyze.
    pub text: &'a str,
    /// Optional record identifier, included in the record JSON.
    pub record_id: Option<&'a str>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate, if bounded.
    pub max_tokens: Option<u32>,
    /// Replaces the domain's extraction prompt entirely when set. The
    /// exemplars still come from the domain, so overrides must stay
    /// exemplar-compatible.
    pub prompt_override: Option<&'a str>,
}

impl Default for ExtractionRequest<'_> {
    fn default() -> Self {
        Self {
            text: "",
            record_id: None,
            temperature: 0.0,
            max_tokens: None,
            prompt_override: None,
        }
    }
}

/// Materializes a prompt template by substituting `{{record_json}}`
/// with the pretty-printed record.
pub(crate) fn prepare_prompt(template: &str, record: &Value) -> String {
    let record_json = serde_json::to_string_pretty(record).unwrap_or_default();
    template.replace("{{record_json}}", &record_json)
}

/// Extracts triples from a single text.
///
/// Empty text returns an empty list without calling the provider.
/// Duplicate triples from the provider are passed through; callers
/// deduplicate if they need to.
///
/// # Errors
///
/// Surfaces domain resource errors and provider transport/parse errors.
pub fn extract_from_text(
    client: &dyn LlmClient,
    domain: &KnowledgeDomain,
    request: &ExtractionRequest<'_>,
) -> Result<Vec<Triple>> {
    if request.text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut record = serde_json::json!({ "text": request.text });
    if let Some(id) = request.record_id {
        record["id"] = Value::String(id.to_string());
    }

    let template = match request.prompt_override {
        Some(template) => template,
        None => domain.extraction().prompt()?,
    };
    let prompt = prepare_prompt(template, &record);
    let examples = domain.extraction().examples()?;
    let schema = triple_schema();

    let triples = client.extract(&ExtractRequest {
        text: &prompt,
        prompt_description: EXTRACTION_PROMPT_DESCRIPTION,
        examples,
        schema_hint: &schema,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    })?;

    tracing::debug!(
        domain = domain.name(),
        record_id = request.record_id.unwrap_or("<none>"),
        triples = triples.len(),
        "Extraction complete"
    );

    Ok(triples)
}

/// Extracts triples from an input record of the standard shape
/// (`{"id": ..., "text": ..., ...}`). Fields other than `id` and `text`
/// are ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the record has no string `text`
/// field; extraction errors propagate.
pub fn extract_from_record(
    client: &dyn LlmClient,
    domain: &KnowledgeDomain,
    record: &Value,
    temperature: f32,
    max_tokens: Option<u32>,
) -> Result<Vec<Triple>> {
    let text = record
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidInput("record missing required field: text".to_string()))?;

    let record_id = record.get("id").map(|id| match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    extract_from_text(
        client,
        domain,
        &ExtractionRequest {
            text,
            record_id: record_id.as_deref(),
            temperature,
            max_tokens,
            prompt_override: None,
        },
    )
}
