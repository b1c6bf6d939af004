//! Planner Agent: topic to research plan

use crate::agents::extract_json_object;
use crate::executor::{AgentExecutor, ExecutorConfig};
use crate::prompts::{PLANNER_SYSTEM, Prompts};
use async_trait::async_trait;
use regex::Regex;
use research_core::{Agent, AgentRole, ResearchPlan, Result, RunContext, TranscriptEntry};
use research_llm::LLMProvider;
use research_tools::ToolRegistry;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

/// Upper bound on queries kept from a plan
pub const MAX_PLAN_QUERIES: usize = 8;

static BULLET: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)])\s+(.+?)\s*$").ok());

#[derive(Debug, Deserialize)]
struct PlanAnswer {
    #[serde(default)]
    search_queries: Vec<String>,
    #[serde(default)]
    focus_areas: Vec<String>,
}

/// Turns the topic into a [`ResearchPlan`] and records it in the transcript
pub struct PlannerAgent {
    executor: AgentExecutor,
    prompts: Arc<Prompts>,
}

impl PlannerAgent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        prompts: Arc<Prompts>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let executor = AgentExecutor::builder(AgentRole::Planner)
            .provider(provider)
            .tool_registry(Arc::new(ToolRegistry::new()))
            .config(config)
            .system_prompt(prompts.text(PLANNER_SYSTEM)?)
            .json_mode(true)
            .build()?;

        Ok(Self { executor, prompts })
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    async fn process(&self, input: String, context: &mut RunContext) -> Result<String> {
        let topic = input.trim().to_string();
        let prompt = self.prompts.planner_user(&topic)?;
        let output = self.executor.run(prompt, context).await?;

        let plan = parse_plan(&topic, &output);
        if plan.search_queries.is_empty() {
            warn!(run_id = %context.run_id(), "Planner produced no queries, searching the topic itself");
            context.record(TranscriptEntry::EmptyResult {
                agent: AgentRole::Planner,
                detail: "no search queries planned; the topic itself will be searched".to_string(),
            });
        }

        info!(
            run_id = %context.run_id(),
            queries = plan.search_queries.len(),
            focus_areas = plan.focus_areas.len(),
            "Research plan created"
        );

        let summary = plan
            .effective_queries()
            .iter()
            .map(|q| format!("- {q}"))
            .collect::<Vec<_>>()
            .join("\n");

        context.record(TranscriptEntry::AgentOutput {
            agent: AgentRole::Planner,
            content: output,
        });
        context.record(TranscriptEntry::Plan { plan });
        Ok(summary)
    }

    fn name(&self) -> &str {
        AgentRole::Planner.display_name()
    }

    fn role(&self) -> AgentRole {
        AgentRole::Planner
    }
}

/// Parse the planner's answer as JSON, falling back to a bullet list.
///
/// The plan's topic is always the user's topic.
pub fn parse_plan(topic: &str, answer: &str) -> ResearchPlan {
    let (queries, focus_areas) = match extract_json_object(answer)
        .and_then(|json| serde_json::from_str::<PlanAnswer>(json).ok())
    {
        Some(parsed) => (parsed.search_queries, parsed.focus_areas),
        None => (bullet_items(answer), Vec::new()),
    };

    ResearchPlan {
        topic: topic.to_string(),
        search_queries: clean(queries).into_iter().take(MAX_PLAN_QUERIES).collect(),
        focus_areas: clean(focus_areas),
    }
}

fn bullet_items(text: &str) -> Vec<String> {
    BULLET.as_ref().map_or_else(Vec::new, |re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    })
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '`').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
