//! Editor Agent: collected facts to the final report

use crate::agents::{extract_json_object, strip_code_fence};
use crate::executor::{AgentExecutor, ExecutorConfig};
use crate::prompts::{EDITOR_SYSTEM, Prompts};
use async_trait::async_trait;
use research_core::{
    Agent, AgentRole, Fact, Report, ReportDraft, Result, RunContext, TranscriptEntry,
};
use research_core::fact::UNSPECIFIED_SOURCE;
use research_llm::LLMProvider;
use research_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// Compiles the ordered facts of the run into one [`Report`].
///
/// Always produces a report, even from an empty fact store or an empty model
/// answer, and stores it in the run context.
pub struct EditorAgent {
    executor: AgentExecutor,
    prompts: Arc<Prompts>,
}

impl EditorAgent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        prompts: Arc<Prompts>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let executor = AgentExecutor::builder(AgentRole::Editor)
            .provider(provider)
            .tool_registry(Arc::new(ToolRegistry::new()))
            .config(config)
            .system_prompt(prompts.text(EDITOR_SYSTEM)?)
            .json_mode(true)
            .build()?;

        Ok(Self { executor, prompts })
    }
}

#[async_trait]
impl Agent for EditorAgent {
    async fn process(&self, input: String, context: &mut RunContext) -> Result<String> {
        let topic = input.trim().to_string();
        let focus_areas = context
            .plan()
            .map(|p| p.focus_areas.clone())
            .unwrap_or_default();
        let prompt = self
            .prompts
            .editor_user(&topic, &focus_areas, context.facts().as_slice())?;

        let output = self.executor.run(prompt, context).await?;

        let parsed = parse_report(&output);
        let draft = if parsed.report.trim().is_empty() {
            warn!(run_id = %context.run_id(), "Editor returned no report body, building report from facts");
            context.record(TranscriptEntry::EmptyResult {
                agent: AgentRole::Editor,
                detail: "editor returned no report body; report lists the collected facts".to_string(),
            });
            ReportDraft {
                title: parsed.title,
                ..degraded_draft(context.facts().as_slice())
            }
        } else {
            parsed
        };

        let report = Report::from_draft(draft, &format!("Research Report: {topic}"));
        let markdown = report.markdown().to_string();

        info!(
            run_id = %context.run_id(),
            title = %report.title(),
            word_count = report.word_count(),
            sources = report.sources().len(),
            facts = context.facts().len(),
            "Report produced"
        );

        context.record(TranscriptEntry::AgentOutput {
            agent: AgentRole::Editor,
            content: output,
        });
        context.set_report(report)?;
        Ok(markdown)
    }

    fn name(&self) -> &str {
        AgentRole::Editor.display_name()
    }

    fn role(&self) -> AgentRole {
        AgentRole::Editor
    }
}

/// Parse the editor's answer: a JSON report, fenced or bare, or otherwise
/// the whole answer as the report body.
pub fn parse_report(answer: &str) -> ReportDraft {
    let parsed = extract_json_object(answer)
        .and_then(|json| serde_json::from_str::<ReportDraft>(json).ok())
        .filter(|d| !d.report.trim().is_empty() || !d.title.trim().is_empty());

    parsed.unwrap_or_else(|| ReportDraft {
        report: strip_code_fence(answer).to_string(),
        ..ReportDraft::default()
    })
}

/// Report used when the model answered with nothing
fn degraded_draft(facts: &[Fact]) -> ReportDraft {
    let report = if facts.is_empty() {
        "The editor returned no content and no facts were collected for this topic.".to_string()
    } else {
        let items: Vec<String> = facts.iter().map(|f| format!("- {}", f.text)).collect();
        format!(
            "The editor returned no content. The facts collected during research are listed below.\n\n{}",
            items.join("\n")
        )
    };

    let mut sources: Vec<String> = Vec::new();
    for fact in facts {
        if fact.source != UNSPECIFIED_SOURCE && !sources.contains(&fact.source) {
            sources.push(fact.source.clone());
        }
    }

    ReportDraft {
        outline: vec!["Collected facts".to_string()],
        report,
        sources,
        ..ReportDraft::default()
    }
}
