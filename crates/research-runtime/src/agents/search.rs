//! Search Agent: one query in, facts saved into the run's fact store

use crate::executor::{AgentExecutor, ExecutorConfig};
use crate::prompts::{Prompts, SEARCH_SYSTEM};
use async_trait::async_trait;
use research_core::{Agent, AgentRole, Error, Result, RunContext, TranscriptEntry};
use research_llm::LLMProvider;
use research_tools::{SaveFactTool, SearchProvider, ToolRegistry, WebSearchTool, format_hits};
use std::sync::Arc;
use tracing::{info, warn};

/// Searches the web for one sub-query and lets the model save the useful
/// facts through `save_important_fact`, one call per fact.
///
/// The first search is issued directly. If it fails or comes back empty the
/// model is not consulted, nothing is appended, and the round is recorded
/// with zero facts so the coordinator can move on.
pub struct SearchAgent {
    executor: AgentExecutor,
    web_search: WebSearchTool,
    prompts: Arc<Prompts>,
}

impl SearchAgent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        search: Arc<dyn SearchProvider>,
        prompts: Arc<Prompts>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let web_search = WebSearchTool::new(search);
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(SaveFactTool::new()))
            .with_tool(Arc::new(web_search.clone()));

        let executor = AgentExecutor::builder(AgentRole::Search)
            .provider(provider)
            .tool_registry(Arc::new(registry))
            .config(config)
            .system_prompt(prompts.text(SEARCH_SYSTEM)?)
            .build()?;

        Ok(Self {
            executor,
            web_search,
            prompts,
        })
    }

    fn finish_empty(context: &mut RunContext, query: String, detail: String) -> String {
        warn!(run_id = %context.run_id(), %query, %detail, "Search round produced no facts");
        context.record(TranscriptEntry::EmptyResult {
            agent: AgentRole::Search,
            detail,
        });
        context.record(TranscriptEntry::SearchCompleted {
            query,
            facts_added: 0,
        });
        String::new()
    }
}

#[async_trait]
impl Agent for SearchAgent {
    async fn process(&self, input: String, context: &mut RunContext) -> Result<String> {
        let query = input.trim().to_string();
        let before = context.facts().len();

        let searched = self.web_search.search(&query).await;
        context.record(TranscriptEntry::ToolCall {
            agent: AgentRole::Search,
            tool: WebSearchTool::NAME.to_string(),
            is_error: searched.is_err(),
        });

        let hits = match searched {
            Ok(hits) if hits.is_empty() => {
                let detail = format!("no search results for '{query}'");
                return Ok(Self::finish_empty(context, query, detail));
            }
            Ok(hits) => hits,
            // a rejected key fails every round; surface it instead of degrading
            Err(e @ Error::Configuration(_)) => {
                warn!(run_id = %context.run_id(), %query, error = %e, "Search provider rejected the configuration");
                return Err(e);
            }
            Err(e) => {
                let detail = format!("search for '{query}' failed: {e}");
                return Ok(Self::finish_empty(context, query, detail));
            }
        };

        let focus_areas = context
            .plan()
            .map(|p| p.focus_areas.clone())
            .unwrap_or_default();
        let prompt =
            self.prompts
                .search_user(context.topic(), &focus_areas, &query, &format_hits(&hits))?;

        let output = self.executor.run(prompt, context).await?;
        let facts_added = context.facts().len() - before;

        info!(
            run_id = %context.run_id(),
            %query,
            hits = hits.len(),
            facts_added,
            "Search round completed"
        );

        if facts_added == 0 {
            context.record(TranscriptEntry::EmptyResult {
                agent: AgentRole::Search,
                detail: format!("no facts saved for '{query}'"),
            });
        }
        context.record(TranscriptEntry::AgentOutput {
            agent: AgentRole::Search,
            content: output.clone(),
        });
        context.record(TranscriptEntry::SearchCompleted { query, facts_added });

        Ok(output)
    }

    fn name(&self) -> &str {
        AgentRole::Search.display_name()
    }

    fn role(&self) -> AgentRole {
        AgentRole::Search
    }
}
