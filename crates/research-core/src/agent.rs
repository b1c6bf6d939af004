//! Core Agent trait definition

use crate::{Result, RunContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of specialised agents the coordinator can hand off to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Turns the topic into a research plan (search queries, focus areas)
    Planner,
    /// Searches the web and saves facts
    Search,
    /// Compiles the saved facts into the final report
    Editor,
}

impl AgentRole {
    /// Human-readable agent name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Planner => "Planner Agent",
            Self::Search => "Search Agent",
            Self::Editor => "Editor Agent",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Core trait that all agents must implement
///
/// Every turn receives the run's [`RunContext`] explicitly; agents never keep
/// per-run state of their own, so one agent instance can serve any number of
/// runs one after another.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Process input and return the agent's textual output
    async fn process(&self, input: String, context: &mut RunContext) -> Result<String>;

    /// Get the agent's name
    fn name(&self) -> &str;

    /// The role this agent plays in a research run
    fn role(&self) -> AgentRole;
}
