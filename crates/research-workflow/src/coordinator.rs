//! Coordinator: the sequential hand-off loop of one research run

use crate::handoff::{HandOff, decide, progress_for};
use async_trait::async_trait;
use research_core::{AgentRole, Error, Result, RunContext, RunOutcome, TranscriptEntry};
use research_runtime::ResearchRuntime;
use research_utils::WorkflowLimits;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Receives progress while a run is driven
#[async_trait]
pub trait RunObserver: Send + Sync {
    /// Called before each hand-off, after planning and on completion
    async fn on_progress(&self, _percent: u8, _stage: &str, _context: &RunContext) {}
}

/// Observer that ignores every event
pub struct NoOpObserver;

#[async_trait]
impl RunObserver for NoOpObserver {}

/// Reject empty topics before anything else happens
pub fn validate_topic(topic: &str) -> Result<String> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(Error::InvalidInput(
            "please enter a research topic".to_string(),
        ));
    }
    Ok(topic.to_string())
}

/// Hands control to the specialised agents until the run has a report
#[derive(Clone)]
pub struct Coordinator {
    runtime: Arc<ResearchRuntime>,
    limits: WorkflowLimits,
}

impl Coordinator {
    pub fn new(runtime: Arc<ResearchRuntime>) -> Self {
        let limits = *runtime.limits();
        Self { runtime, limits }
    }

    /// Override the limits taken from the runtime
    pub fn with_limits(mut self, limits: WorkflowLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &WorkflowLimits {
        &self.limits
    }

    /// Run a topic from start to finish in a fresh context
    pub async fn run(&self, topic: &str, observer: &dyn RunObserver) -> Result<RunOutcome> {
        let topic = validate_topic(topic)?;
        let mut context = RunContext::new(topic);
        self.drive(&mut context, observer).await?;
        Ok(context.finish())
    }

    /// Drive `context` until a report exists.
    ///
    /// Every hand-off is recorded in the transcript before the agent runs.
    /// Agent errors abort the run; the context keeps whatever was collected.
    #[instrument(skip(self, context, observer), fields(run_id = %context.run_id(), topic = %context.topic()))]
    pub async fn drive(&self, context: &mut RunContext, observer: &dyn RunObserver) -> Result<()> {
        if context.topic().trim().is_empty() {
            return Err(Error::InvalidInput("please enter a research topic".to_string()));
        }
        if context.transcript().is_empty() {
            context.record(TranscriptEntry::Topic {
                topic: context.topic().to_string(),
            });
        }

        loop {
            let handoff = decide(context.transcript(), &self.limits);
            let percent = progress_for(&handoff, context.transcript(), &self.limits);
            observer.on_progress(percent, &handoff.stage(), context).await;

            let (role, input) = match handoff {
                HandOff::Finish => {
                    info!(
                        facts = context.facts().len(),
                        handoffs = context.transcript().handoff_count(),
                        "Research run finished"
                    );
                    return Ok(());
                }
                HandOff::Plan => (AgentRole::Planner, context.topic().to_string()),
                HandOff::Search(query) => (AgentRole::Search, query),
                HandOff::Edit => (AgentRole::Editor, context.topic().to_string()),
            };

            if context.transcript().handoff_count() >= self.limits.max_handoffs {
                warn!(max_handoffs = self.limits.max_handoffs, "Hand-off limit reached");
                return Err(Error::HandOffLimitExceeded(self.limits.max_handoffs));
            }

            info!(agent = %role, input = %input, "Handing off");
            context.record(TranscriptEntry::HandOff {
                to: role,
                input: input.clone(),
            });

            self.runtime.agent(role).process(input, context).await?;

            if role == AgentRole::Planner {
                observer
                    .on_progress(25, "Research plan ready", context)
                    .await;
            }
        }
    }
}
