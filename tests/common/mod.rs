//! Shared test fixtures: a scripted mock LLM client.

// Each integration test binary uses a different subset of the mock.
#![allow(dead_code)]

use kgforge::Result;
use kgforge::clients::{
    ExtractRequest, GenerateRequest, LlmClient, items_from_value, triples_from_items,
};
use kgforge::models::Triple;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock client that replays queued raw payloads.
///
/// Payloads are routed through the same normalization helpers the real
/// providers use, so malformed-candidate handling is exercised end to
/// end. An empty queue yields an empty result.
#[derive(Debug)]
pub struct MockClient {
    structured: bool,
    extract_queue: Mutex<VecDeque<Result<Value>>>,
    generate_queue: Mutex<VecDeque<Result<Value>>>,
    extract_prompts: Mutex<Vec<String>>,
    generate_prompts: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new(structured: bool) -> Self {
        Self {
            structured,
            extract_queue: Mutex::new(VecDeque::new()),
            generate_queue: Mutex::new(VecDeque::new()),
            extract_prompts: Mutex::new(Vec::new()),
            generate_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_extract(&self, payload: Result<Value>) {
        self.extract_queue.lock().unwrap().push_back(payload);
    }

    pub fn push_generate(&self, payload: Result<Value>) {
        self.generate_queue.lock().unwrap().push_back(payload);
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_prompts.lock().unwrap().len()
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_prompts.lock().unwrap().len()
    }

    pub fn extract_prompts(&self) -> Vec<String> {
        self.extract_prompts.lock().unwrap().clone()
    }

    pub fn generate_prompts(&self) -> Vec<String> {
        self.generate_prompts.lock().unwrap().clone()
    }
}

impl LlmClient for MockClient {
    fn extract(&self, request: &ExtractRequest<'_>) -> Result<Vec<Triple>> {
        self.extract_prompts
            .lock()
            .unwrap()
            .push(request.text.to_string());
        match self.extract_queue.lock().unwrap().pop_front() {
            Some(Ok(payload)) => Ok(triples_from_items(
                items_from_value(payload),
                "mock_extract",
            )),
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    fn generate_json(&self, request: &GenerateRequest<'_>) -> Result<Vec<Value>> {
        self.generate_prompts
            .lock()
            .unwrap()
            .push(request.text.to_string());
        match self.generate_queue.lock().unwrap().pop_front() {
            Some(Ok(payload)) => Ok(items_from_value(payload)),
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    fn model_name(&self) -> String {
        "mock/test-model".to_string()
    }

    fn supports_structured_output(&self) -> bool {
        self.structured
    }
}
