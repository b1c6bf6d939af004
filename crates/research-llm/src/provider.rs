//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A hosted chat-completion service
///
/// The agents only ever see this trait, so tests drive them with scripted
/// in-memory providers.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate one assistant turn for the given conversation
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Provider name, e.g. "openai" or "azure-openai"
    fn name(&self) -> &str;
}
