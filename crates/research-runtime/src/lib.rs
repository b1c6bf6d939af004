//! Agent runtime for research-agents
//!
//! This crate provides the [`AgentExecutor`] tool loop, the prompt templates,
//! the three specialised agents ([`PlannerAgent`], [`SearchAgent`],
//! [`EditorAgent`]) and the [`ResearchRuntime`] that wires them to a model
//! and a search provider.

pub mod agents;
pub mod executor;
pub mod prompts;
pub mod runtime;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agents::{EditorAgent, PlannerAgent, SearchAgent};
pub use executor::{AgentExecutor, AgentExecutorBuilder, ExecutorConfig};
pub use prompts::Prompts;
pub use runtime::{ResearchRuntime, ResearchRuntimeBuilder};
