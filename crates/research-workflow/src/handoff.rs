//! Hand-off decisions
//!
//! The next step of a run is a pure function of its transcript, so the
//! routing can be tested without any model.

use research_core::{AgentRole, Transcript};
use research_utils::WorkflowLimits;
use serde::Serialize;

/// What the coordinator does next
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "query", rename_all = "snake_case")]
pub enum HandOff {
    /// Ask the Planner for a research plan
    Plan,
    /// Send one query to the Search Agent
    Search(String),
    /// Ask the Editor for the report
    Edit,
    /// A report exists; the run is over
    Finish,
}

impl HandOff {
    /// Agent receiving control, `None` for [`HandOff::Finish`]
    pub fn role(&self) -> Option<AgentRole> {
        match self {
            Self::Plan => Some(AgentRole::Planner),
            Self::Search(_) => Some(AgentRole::Search),
            Self::Edit => Some(AgentRole::Editor),
            Self::Finish => None,
        }
    }

    /// Short label shown as the run stage
    pub fn stage(&self) -> String {
        match self {
            Self::Plan => "Planning research".to_string(),
            Self::Search(query) => format!("Searching: {query}"),
            Self::Edit => "Writing report".to_string(),
            Self::Finish => "Report ready".to_string(),
        }
    }
}

/// Pick the next step:
///
/// 1. no plan recorded: [`HandOff::Plan`]
/// 2. a report recorded: [`HandOff::Finish`]
/// 3. planned queries left and fewer than `max_search_rounds` rounds done:
///    [`HandOff::Search`] with the next query
/// 4. otherwise [`HandOff::Edit`]
///
/// A plan without queries searches the topic itself.
pub fn decide(transcript: &Transcript, limits: &WorkflowLimits) -> HandOff {
    let Some(plan) = transcript.plan() else {
        return HandOff::Plan;
    };

    if transcript.has_report() {
        return HandOff::Finish;
    }

    let rounds = transcript.search_rounds();
    if rounds < limits.max_search_rounds {
        if let Some(query) = plan.effective_queries().into_iter().nth(rounds) {
            return HandOff::Search(query);
        }
    }

    HandOff::Edit
}

/// Progress percentage shown when `handoff` starts.
///
/// 0 while planning, 50 to 75 across the search rounds, 75 while editing,
/// 100 once finished. The 25 milestone is reported by the coordinator when
/// the plan arrives.
pub fn progress_for(handoff: &HandOff, transcript: &Transcript, limits: &WorkflowLimits) -> u8 {
    match handoff {
        HandOff::Plan => 0,
        HandOff::Search(_) => {
            let planned = transcript
                .plan()
                .map_or(1, |p| p.effective_queries().len())
                .min(limits.max_search_rounds)
                .max(1);
            let done = transcript.search_rounds().min(planned);
            (50 + 25 * done / planned) as u8
        }
        HandOff::Edit => 75,
        HandOff::Finish => 100,
    }
}
