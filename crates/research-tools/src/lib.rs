//! Tools the research agents can call
//!
//! Every tool receives the run's [`RunContext`](research_core::RunContext), so
//! a tool such as [`SaveFactTool`] writes straight into the current run's
//! fact store.

pub mod facts;
pub mod registry;
pub mod search;
pub mod tool;

pub use facts::SaveFactTool;
pub use registry::ToolRegistry;
pub use search::{SearchHit, SearchProvider, TavilySearch, WebSearchTool, format_hits};
pub use tool::Tool;
