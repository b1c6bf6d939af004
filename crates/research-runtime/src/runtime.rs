//! Runtime wiring the research agents to a model and a search provider

use crate::agents::{EditorAgent, PlannerAgent, SearchAgent};
use crate::executor::ExecutorConfig;
use crate::prompts::Prompts;
use research_core::{Agent, AgentRole, Error, Result};
use research_llm::{LLMProvider, OpenAIProvider};
use research_tools::{SearchProvider, TavilySearch};
use research_utils::{AppConfig, WorkflowLimits};
use std::sync::Arc;
use tracing::info;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// The three specialised agents plus the limits they run under.
///
/// Agents hold no per-run state, so one runtime serves every session.
pub struct ResearchRuntime {
    planner: PlannerAgent,
    search: SearchAgent,
    editor: EditorAgent,
    limits: WorkflowLimits,
}

impl ResearchRuntime {
    pub fn builder() -> ResearchRuntimeBuilder {
        ResearchRuntimeBuilder::new()
    }

    /// Build the production runtime: OpenAI/Azure model and Tavily search
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = OpenAIProvider::from_settings(&config.llm)?;
        let search = TavilySearch::new(&config.search)?;

        info!(
            provider = provider.name(),
            model = %config.llm.model,
            "Research runtime configured"
        );

        Self::builder()
            .provider(Arc::new(provider))
            .search(Arc::new(search))
            .model(config.llm.model.clone())
            .limits(config.limits)
            .build()
    }

    /// The agent playing `role`
    pub fn agent(&self, role: AgentRole) -> &dyn Agent {
        match role {
            AgentRole::Planner => &self.planner,
            AgentRole::Search => &self.search,
            AgentRole::Editor => &self.editor,
        }
    }

    pub fn limits(&self) -> &WorkflowLimits {
        &self.limits
    }
}

/// Builder for [`ResearchRuntime`]
pub struct ResearchRuntimeBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    search: Option<Arc<dyn SearchProvider>>,
    model: String,
    limits: WorkflowLimits,
}

impl ResearchRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            search: None,
            model: DEFAULT_MODEL.to_string(),
            limits: WorkflowLimits::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn limits(mut self, limits: WorkflowLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn build(self) -> Result<ResearchRuntime> {
        self.limits.validate()?;

        let provider = self
            .provider
            .ok_or_else(|| Error::InitializationFailed("LLM provider not set".to_string()))?;
        let search = self
            .search
            .ok_or_else(|| Error::InitializationFailed("search provider not set".to_string()))?;

        let prompts = Arc::new(Prompts::new()?);
        let config = ExecutorConfig {
            max_iterations: self.limits.max_agent_iterations,
            model: self.model,
            system_prompt: None,
            max_tokens: self.limits.max_tokens,
            temperature: Some(self.limits.temperature),
            json_mode: false,
        };

        Ok(ResearchRuntime {
            planner: PlannerAgent::new(provider.clone(), prompts.clone(), config.clone())?,
            search: SearchAgent::new(provider.clone(), search, prompts.clone(), config.clone())?,
            editor: EditorAgent::new(provider, prompts, config)?,
            limits: self.limits,
        })
    }
}

impl Default for ResearchRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
