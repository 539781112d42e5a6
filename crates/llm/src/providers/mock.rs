//! Deterministic generation double.
//!
//! Replies are chosen by substring rules over the system and user prompt, so a
//! test can script the compression, answer and formatting calls of one
//! question independently. Every request is recorded for later assertions.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use pagewise_core::{AppError, AppResult};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Clone)]
enum Fallback {
    Fixed(String),
    Echo,
}

/// Scripted LLM client.
#[derive(Debug)]
pub struct MockLlmClient {
    rules: Vec<(String, Reply)>,
    fallback: Fallback,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    /// Reply with `text` unless a rule matches.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: Fallback::Fixed(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply with the user prompt itself unless a rule matches.
    pub fn echo() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Fallback::Echo,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `text` when the prompt contains `needle`.
    pub fn when_contains(mut self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Reply::Text(text.into())));
        self
    }

    /// Fail when the prompt contains `needle`.
    pub fn fail_when_contains(
        mut self,
        needle: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.rules.push((needle.into(), Reply::Fail(message.into())));
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of completions requested.
    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    fn record(&self, request: &LlmRequest) {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
    }

    fn reply_for(&self, request: &LlmRequest) -> Reply {
        let system = request.system.as_deref().unwrap_or_default();
        self.rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle) || system.contains(needle))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| match &self.fallback {
                Fallback::Fixed(text) => Reply::Text(text.clone()),
                Fallback::Echo => Reply::Text(request.prompt.clone()),
            })
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.record(request);

        match self.reply_for(request) {
            Reply::Text(content) => {
                let usage = LlmUsage::new(
                    (request.prompt.len() / 4) as u32,
                    (content.len() / 4) as u32,
                );
                Ok(LlmResponse {
                    content,
                    model: request.model.clone(),
                    usage,
                })
            }
            Reply::Fail(message) => Err(AppError::Llm(message)),
        }
    }
}
