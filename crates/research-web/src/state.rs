//! Shared server state

use research_runtime::ResearchRuntime;
use research_workflow::SessionManager;
use std::sync::Arc;

pub struct AppState {
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(runtime: Arc<ResearchRuntime>) -> Self {
        Self {
            sessions: SessionManager::new(runtime),
        }
    }

    pub fn with_session_ttl(mut self, ttl_seconds: i64) -> Self {
        self.sessions = self.sessions.with_ttl(ttl_seconds);
        self
    }
}
