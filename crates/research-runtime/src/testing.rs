//! In-memory providers for tests
//!
//! [`ScriptedProvider`] answers completion requests from a queue of canned
//! responses; [`StaticSearch`] answers search queries from a fixed table.

use async_trait::async_trait;
use research_core::{Error, Result};
use research_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    StopReason, TokenUsage,
};
use research_tools::{SearchHit, SearchProvider};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// LLM provider that replays queued responses in order
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<std::result::Result<CompletionResponse, LLMError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, item: std::result::Result<CompletionResponse, LLMError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(item);
    }

    /// Queue a plain text answer
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }));
    }

    /// Queue an answer requesting the given tool calls
    pub fn push_tool_calls(&self, calls: Vec<(&str, Value)>) {
        let blocks = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, input))| ContentBlock::ToolUse {
                id: format!("call_{i}"),
                name: name.to_string(),
                input,
            })
            .collect();

        self.push(Ok(CompletionResponse {
            message: Message::assistant_blocks(blocks),
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }));
    }

    pub fn push_error(&self, error: LLMError) {
        self.push(Err(error));
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> research_llm::Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::RequestFailed("script exhausted".to_string())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Debug, Clone, Copy)]
enum SearchFailure {
    Unreachable,
    RejectedKey,
}

/// Search provider backed by a fixed query table
#[derive(Default)]
pub struct StaticSearch {
    results: HashMap<String, Vec<SearchHit>>,
    fallback: Vec<SearchHit>,
    failure: Option<SearchFailure>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose every search fails with `ServiceUnavailable`
    pub fn failing() -> Self {
        Self {
            failure: Some(SearchFailure::Unreachable),
            ..Self::default()
        }
    }

    /// Provider that refuses the API key on every search
    pub fn rejecting_key() -> Self {
        Self {
            failure: Some(SearchFailure::RejectedKey),
            ..Self::default()
        }
    }

    pub fn with_results(mut self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.results.insert(query.into(), hits);
        self
    }

    /// Hits returned for any query not in the table
    pub fn with_fallback(mut self, hits: Vec<SearchHit>) -> Self {
        self.fallback = hits;
        self
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Convenience constructor for a hit
pub fn hit(title: &str, url: &str, content: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        content: content.to_string(),
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());

        match self.failure {
            Some(SearchFailure::Unreachable) => {
                return Err(Error::ServiceUnavailable(
                    "search provider unreachable".to_string(),
                ));
            }
            Some(SearchFailure::RejectedKey) => {
                return Err(Error::Configuration(
                    "search provider rejected the API key".to_string(),
                ));
            }
            None => {}
        }
        Ok(self
            .results
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
