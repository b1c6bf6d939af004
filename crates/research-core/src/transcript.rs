//! Append-only transcript of a research run

use crate::{AgentRole, ResearchPlan};
use serde::{Deserialize, Serialize};

/// One entry of the run transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEntry {
    /// The topic that started the run
    Topic { topic: String },
    /// Coordinator handed control to an agent
    HandOff { to: AgentRole, input: String },
    /// Planner produced a research plan
    Plan { plan: ResearchPlan },
    /// An agent invoked a tool
    ToolCall {
        agent: AgentRole,
        tool: String,
        is_error: bool,
    },
    /// A search round finished, possibly with zero facts
    SearchCompleted { query: String, facts_added: usize },
    /// A step produced nothing usable; the run continues
    EmptyResult { agent: AgentRole, detail: String },
    /// Final text output of an agent turn
    AgentOutput { agent: AgentRole, content: String },
    /// The Editor stored the final report
    ReportProduced { title: String },
}

/// Ordered, append-only list of [`TranscriptEntry`] values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently recorded plan
    pub fn plan(&self) -> Option<&ResearchPlan> {
        self.entries.iter().rev().find_map(|e| match e {
            TranscriptEntry::Plan { plan } => Some(plan),
            _ => None,
        })
    }

    /// Queries that have completed a search round, in order
    pub fn searched_queries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                TranscriptEntry::SearchCompleted { query, .. } => Some(query.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn search_rounds(&self) -> usize {
        self.searched_queries().len()
    }

    pub fn handoff_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, TranscriptEntry::HandOff { .. }))
            .count()
    }

    pub fn has_report(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, TranscriptEntry::ReportProduced { .. }))
    }
}
