//! End-to-end extraction scenarios against a scripted client.

mod common;

use common::MockClient;
use kgforge::builder::{ExtractionRequest, extract_from_record, extract_from_text};
use kgforge::domains::{ExtractionMode, get_domain};
use kgforge::models::InferenceType;
use kgforge::{Error, LlmClient};
use serde_json::json;

#[test]
fn single_explicit_extraction() {
    let client = MockClient::new(true);
    client.push_extract(Ok(json!([
        {"head": "John Smith", "relation": "works_at", "tail": "Google Inc.", "inference": "explicit"}
    ])));
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    let triples = extract_from_text(
        &client,
        &domain,
        &ExtractionRequest {
            text: "John Smith works at Google Inc.",
            ..ExtractionRequest::default()
        },
    )
    .unwrap();

    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].head(), "John Smith");
    assert_eq!(triples[0].relation(), "works_at");
    assert_eq!(triples[0].tail(), "Google Inc.");
    assert_eq!(triples[0].inference(), InferenceType::Explicit);
    assert_eq!(client.extract_calls(), 1);
}

#[test]
fn malformed_candidate_dropped() {
    let client = MockClient::new(true);
    client.push_extract(Ok(json!([
        {"head": "A", "relation": "r", "tail": "B"},
        {"head": "", "relation": "r", "tail": "C"}
    ])));
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    let triples = extract_from_text(
        &client,
        &domain,
        &ExtractionRequest {
            text: "some text",
            ..ExtractionRequest::default()
        },
    )
    .unwrap();

    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].head(), "A");
    // The surviving triple defaulted to explicit.
    assert_eq!(triples[0].inference(), InferenceType::Explicit);
}

#[test]
fn empty_text_skips_provider() {
    let client = MockClient::new(true);
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    let triples = extract_from_text(
        &client,
        &domain,
        &ExtractionRequest {
            text: "   \n  ",
            ..ExtractionRequest::default()
        },
    )
    .unwrap();

    assert!(triples.is_empty());
    assert_eq!(client.extract_calls(), 0);
}

#[test]
fn prompt_carries_record_json() {
    let client = MockClient::new(true);
    client.push_extract(Ok(json!([])));
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    extract_from_text(
        &client,
        &domain,
        &ExtractionRequest {
            text: "Alpha founded Beta.",
            record_id: Some("case-42"),
            ..ExtractionRequest::default()
        },
    )
    .unwrap();

    let prompts = client.extract_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Alpha founded Beta."));
    assert!(prompts[0].contains("case-42"));
    assert!(!prompts[0].contains("{{record_json}}"));
}

#[test]
fn prompt_override_replaces_template() {
    let client = MockClient::new(true);
    client.push_extract(Ok(json!([])));
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    extract_from_text(
        &client,
        &domain,
        &ExtractionRequest {
            text: "Some text.",
            prompt_override: Some("Custom instructions.\n{{record_json}}"),
            ..ExtractionRequest::default()
        },
    )
    .unwrap();

    let prompts = client.extract_prompts();
    assert!(prompts[0].starts_with("Custom instructions."));
}

#[test]
fn duplicates_pass_through_unchanged() {
    let client = MockClient::new(true);
    client.push_extract(Ok(json!([
        {"head": "A", "relation": "r", "tail": "B"},
        {"head": "A", "relation": "r", "tail": "B"}
    ])));
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    let triples = extract_from_text(
        &client,
        &domain,
        &ExtractionRequest {
            text: "text",
            ..ExtractionRequest::default()
        },
    )
    .unwrap();

    // The engine does not deduplicate; that is the caller's decision.
    assert_eq!(triples.len(), 2);
}

#[test]
fn record_extraction_reads_id_and_text() {
    let client = MockClient::new(true);
    client.push_extract(Ok(json!([
        {"head": "A", "relation": "r", "tail": "B"}
    ])));
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    let record = json!({"id": 7, "text": "A relates to B.", "extra": "ignored"});
    let triples = extract_from_record(&client, &domain, &record, 0.0, None).unwrap();

    assert_eq!(triples.len(), 1);
    let prompts = client.extract_prompts();
    assert!(prompts[0].contains('7'));
}

#[test]
fn record_without_text_rejected() {
    let client = MockClient::new(true);
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    let record = json!({"id": "r1", "body": "wrong field"});
    let err = extract_from_record(&client, &domain, &record, 0.0, None).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(client.extract_calls(), 0);
}

#[test]
fn provider_transport_error_surfaces() {
    let client = MockClient::new(true);
    client.push_extract(Err(Error::Transport {
        operation: "mock_extract".to_string(),
        cause: "connection refused".to_string(),
    }));
    let domain = get_domain("default", ExtractionMode::Open).unwrap();

    let err = extract_from_text(
        &client,
        &domain,
        &ExtractionRequest {
            text: "text",
            ..ExtractionRequest::default()
        },
    )
    .unwrap_err();

    assert!(matches!(err, Error::Transport { .. }));
}

#[test]
fn legal_domain_serves_distinct_prompt() {
    let client = MockClient::new(true);
    client.push_extract(Ok(json!([])));
    let legal = get_domain("legal", ExtractionMode::Open).unwrap();

    extract_from_text(
        &client,
        &legal,
        &ExtractionRequest {
            text: "The claimant alleged breach of contract.",
            ..ExtractionRequest::default()
        },
    )
    .unwrap();

    let prompts = client.extract_prompts();
    assert!(prompts[0].contains("legal"));
    assert_eq!(client.model_name(), "mock/test-model");
}
