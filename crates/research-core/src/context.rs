//! Per-run context passed explicitly into every agent turn and tool call

use crate::{Error, Fact, FactStore, Report, ResearchPlan, Result, Transcript, TranscriptEntry};
use serde::Serialize;
use uuid::Uuid;

/// State owned by a single research run.
///
/// Created fresh when a run starts and consumed by [`RunContext::finish`]
/// when it ends; nothing in it survives into the next run.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    topic: String,
    facts: FactStore,
    transcript: Transcript,
    report: Option<Report>,
}

/// What a finished run hands back to its session
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub topic: String,
    pub facts: Vec<Fact>,
    pub transcript: Transcript,
    pub report: Option<Report>,
}

impl RunContext {
    /// Create a new context for `topic` with a fresh run id
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            facts: FactStore::new(),
            transcript: Transcript::new(),
            report: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn facts(&self) -> &FactStore {
        &self.facts
    }

    /// Append a fact, returning the store length afterwards
    pub fn save_fact(&mut self, fact: Fact) -> usize {
        let len = self.facts.append(fact);
        tracing::debug!(run_id = %self.run_id, facts = len, "Fact saved");
        len
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn record(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
    }

    /// Latest plan recorded in the transcript
    pub fn plan(&self) -> Option<&ResearchPlan> {
        self.transcript.plan()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    /// Store the run's report. A run produces exactly one report.
    pub fn set_report(&mut self, report: Report) -> Result<()> {
        if self.report.is_some() {
            return Err(Error::ProcessingFailed(
                "a report was already produced for this run".to_string(),
            ));
        }
        self.transcript.push(TranscriptEntry::ReportProduced {
            title: report.title().to_string(),
        });
        self.report = Some(report);
        Ok(())
    }

    /// Consume the context
    pub fn finish(self) -> RunOutcome {
        RunOutcome {
            run_id: self.run_id,
            topic: self.topic,
            facts: self.facts.into_vec(),
            transcript: self.transcript,
            report: self.report,
        }
    }
}
