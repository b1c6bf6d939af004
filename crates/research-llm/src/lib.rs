//! Chat-completion layer for research-agents
//!
//! Provider-agnostic message, completion and tool-definition types, the
//! [`LLMProvider`] trait the agents talk to, and an OpenAI-compatible
//! provider that also serves Azure OpenAI deployments.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod tools;

pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use providers::{OpenAIConfig, OpenAIProvider};
pub use tools::ToolDefinition;
