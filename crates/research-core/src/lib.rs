//! Core abstractions for research-agents
//!
//! This crate defines the types every research run is built from: the
//! [`Agent`] trait and the closed set of [`AgentRole`]s, the explicit
//! [`RunContext`] handed to every agent turn, the append-only [`FactStore`]
//! and [`Transcript`], the immutable [`Report`], and the shared [`Error`].

pub mod agent;
pub mod context;
pub mod error;
pub mod fact;
pub mod report;
pub mod transcript;

pub use agent::{Agent, AgentRole};
pub use context::{RunContext, RunOutcome};
pub use error::{Error, Result};
pub use fact::{Fact, FactStore};
pub use report::{Report, ReportDraft, ResearchPlan, count_words};
pub use transcript::{Transcript, TranscriptEntry};
