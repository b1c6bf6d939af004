//! Session state and the per-session controller behind the web page

use crate::coordinator::{Coordinator, RunObserver, validate_topic};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use research_core::{Error, Fact, Report, ResearchPlan, Result, RunContext, Transcript};
use research_runtime::ResearchRuntime;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Lifecycle of the session's current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Everything one browser session shows
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub status: RunStatus,
    pub topic: Option<String>,
    pub progress: u8,
    pub stage: String,
    pub facts: Vec<Fact>,
    pub transcript: Transcript,
    pub plan: Option<ResearchPlan>,
    #[serde(skip)]
    pub report: Option<Report>,
    pub last_error: Option<String>,
    pub error_kind: Option<&'static str>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl SessionState {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            status: RunStatus::Idle,
            topic: None,
            progress: 0,
            stage: String::new(),
            facts: Vec::new(),
            transcript: Transcript::new(),
            plan: None,
            report: None,
            last_error: None,
            error_kind: None,
            created_at: now,
            last_active: now,
        }
    }

    pub fn has_report(&self) -> bool {
        self.report.is_some()
    }
}

/// A report ready to be saved as a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDownload {
    pub file_name: String,
    pub content: String,
}

impl ReportDownload {
    pub const MIME_TYPE: &'static str = "text/markdown";
}

/// Owns exactly one [`SessionState`] and runs research for it
pub struct SessionController {
    id: String,
    coordinator: Coordinator,
    state: Arc<RwLock<SessionState>>,
}

impl SessionController {
    pub fn new(id: impl Into<String>, coordinator: Coordinator) -> Self {
        Self {
            id: id.into(),
            coordinator,
            state: Arc::new(RwLock::new(SessionState::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Validate the topic and reset the state for a new run.
    ///
    /// The previous report and facts are discarded here. Nothing external is
    /// called, so an empty topic fails without side effects.
    pub fn prepare_run(&self, topic: &str) -> Result<String> {
        let topic = validate_topic(topic)?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.status == RunStatus::Running {
            return Err(Error::RunInProgress);
        }

        let created_at = state.created_at;
        *state = SessionState {
            status: RunStatus::Running,
            topic: Some(topic.clone()),
            stage: "Starting research".to_string(),
            created_at,
            ..SessionState::new()
        };

        info!(session_id = %self.id, %topic, "Research run started");
        Ok(topic)
    }

    /// Drive a prepared run to the end and commit its outcome
    pub async fn execute(&self, topic: String) -> Result<()> {
        let mut context = RunContext::new(topic);
        let observer = SessionObserver {
            state: Arc::clone(&self.state),
        };

        let result = self.coordinator.drive(&mut context, &observer).await;
        let outcome = context.finish();

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.facts = outcome.facts;
        state.plan = outcome.transcript.plan().cloned();
        state.transcript = outcome.transcript;
        state.report = outcome.report;
        state.last_active = Utc::now();

        match &result {
            Ok(()) => {
                state.status = RunStatus::Completed;
                state.progress = 100;
                state.stage = "Report ready".to_string();
                info!(session_id = %self.id, run_id = %outcome.run_id, facts = state.facts.len(), "Research run completed");
            }
            Err(e) => {
                state.status = RunStatus::Failed;
                state.stage = "Failed".to_string();
                state.last_error = Some(e.to_string());
                state.error_kind = Some(e.kind());
                warn!(session_id = %self.id, run_id = %outcome.run_id, error = %e, "Research run failed");
            }
        }

        result
    }

    /// Start a run and wait for it to finish
    pub async fn start_run(&self, topic: &str) -> Result<()> {
        let topic = self.prepare_run(topic)?;
        self.execute(topic).await
    }

    /// Snapshot of the session for display
    pub fn progress(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Markdown of the current report, if a run has completed
    pub fn render_report(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .report
            .as_ref()
            .map(|r| r.markdown().to_string())
    }

    /// The current report as a `.md` file, byte-identical to the rendered text
    pub fn download_report(&self) -> Result<ReportDownload> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let report = state.report.as_ref().ok_or(Error::NoReportAvailable)?;

        Ok(ReportDownload {
            file_name: report.file_name(),
            content: report.markdown().to_string(),
        })
    }

    pub fn status(&self) -> RunStatus {
        self.state.read().unwrap_or_else(PoisonError::into_inner).status
    }

    fn touch(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .last_active = Utc::now();
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.status != RunStatus::Running && Utc::now() - state.last_active > ttl
    }
}

/// Mirrors coordinator progress into the session while a run is active
struct SessionObserver {
    state: Arc<RwLock<SessionState>>,
}

#[async_trait]
impl RunObserver for SessionObserver {
    async fn on_progress(&self, percent: u8, stage: &str, context: &RunContext) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.status != RunStatus::Running {
            return;
        }
        state.progress = percent;
        state.stage = stage.to_string();
        state.facts = context.facts().as_slice().to_vec();
        state.plan = context.plan().cloned();
        state.last_active = Utc::now();
    }
}

/// Controllers of all live sessions, keyed by session id
pub struct SessionManager {
    runtime: Arc<ResearchRuntime>,
    sessions: RwLock<HashMap<String, Arc<SessionController>>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(runtime: Arc<ResearchRuntime>) -> Self {
        Self {
            runtime,
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::hours(1),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.ttl = Duration::seconds(ttl_seconds);
        self
    }

    /// Controller for `session_id`, created on first use
    pub fn get_or_create(&self, session_id: &str) -> Arc<SessionController> {
        if let Some(existing) = self.get(session_id) {
            existing.touch();
            return existing;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!(%session_id, "Session created");
            Arc::new(SessionController::new(
                session_id,
                Coordinator::new(Arc::clone(&self.runtime)),
            ))
        }))
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<SessionController>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .is_some()
    }

    /// Drop idle sessions older than the TTL; running sessions are kept
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, controller| !controller.is_expired(self.ttl));
        before - sessions.len()
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_runtime::testing::{ScriptedProvider, StaticSearch, hit};
    use serde_json::json;

    fn runtime(provider: Arc<ScriptedProvider>, search: StaticSearch) -> Arc<ResearchRuntime> {
        Arc::new(
            ResearchRuntime::builder()
                .provider(provider)
                .search(Arc::new(search))
                .build()
                .unwrap(),
        )
    }

    fn controller(provider: Arc<ScriptedProvider>, search: StaticSearch) -> SessionController {
        SessionController::new("s1", Coordinator::new(runtime(provider, search)))
    }

    fn script_run(provider: &ScriptedProvider, facts: &[&str], title: &str) {
        provider.push_text(r#"{"search_queries": ["q1"], "focus_areas": []}"#);
        provider.push_tool_calls(
            facts
                .iter()
                .map(|f| ("save_important_fact", json!({ "fact": f })))
                .collect(),
        );
        provider.push_text("done");
        provider.push_text(
            json!({
                "title": title,
                "outline": ["Findings"],
                "report": facts.join(" "),
                "sources": [],
                "word_count": 0
            })
            .to_string(),
        );
    }

    fn search() -> StaticSearch {
        StaticSearch::new().with_fallback(vec![hit("A", "https://a", "content")])
    }

    #[tokio::test]
    async fn test_download_before_run_fails() {
        let session = controller(Arc::new(ScriptedProvider::new()), search());
        assert!(matches!(
            session.download_report(),
            Err(Error::NoReportAvailable)
        ));
        assert_eq!(session.status(), RunStatus::Idle);
        assert!(session.render_report().is_none());
    }

    #[tokio::test]
    async fn test_lisbon_download_matches_render() {
        let provider = Arc::new(ScriptedProvider::new());
        script_run(&provider, &["F1", "F2", "F3"], "Best Coffee Shops in Lisbon");
        let session = controller(provider, search());

        session.start_run("best coffee shops in Lisbon").await.unwrap();

        let state = session.progress();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.progress, 100);
        assert_eq!(state.facts.len(), 3);

        let rendered = session.render_report().unwrap();
        let download = session.download_report().unwrap();
        assert_eq!(download.content, rendered);
        assert_eq!(download.file_name, "Best_Coffee_Shops_in_Lisbon.md");
        for fact in ["F1", "F2", "F3"] {
            assert!(rendered.contains(fact));
        }
    }

    #[tokio::test]
    async fn test_new_run_discards_previous() {
        let provider = Arc::new(ScriptedProvider::new());
        script_run(&provider, &["A1", "A2"], "First");
        script_run(&provider, &["B1"], "Second");
        let session = controller(provider, search());

        session.start_run("first topic").await.unwrap();
        assert_eq!(session.progress().facts.len(), 2);

        session.prepare_run("second topic").unwrap();
        assert!(session.render_report().is_none());
        assert!(session.progress().facts.is_empty());

        session.execute("second topic".to_string()).await.unwrap();
        let state = session.progress();
        let texts: Vec<&str> = state.facts.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["B1"]);
        assert!(!session.render_report().unwrap().contains("A1"));
        assert_eq!(session.download_report().unwrap().file_name, "Second.md");
    }

    #[tokio::test]
    async fn test_empty_topic_rejected_without_side_effects() {
        let provider = Arc::new(ScriptedProvider::new());
        let session = controller(provider.clone(), search());

        let result = session.start_run("  \n ").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(session.status(), RunStatus::Idle);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_second_start_while_running_rejected() {
        let session = controller(Arc::new(ScriptedProvider::new()), search());
        session.prepare_run("coffee").unwrap();
        assert!(matches!(
            session.prepare_run("tea"),
            Err(Error::RunInProgress)
        ));
    }

    #[tokio::test]
    async fn test_failed_run_records_error() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_error(research_llm::LLMError::RequestFailed("HTTP 502".to_string()));
        let session = controller(provider, search());

        let result = session.start_run("coffee").await;
        assert!(matches!(result, Err(Error::ServiceUnavailable(_))));

        let state = session.progress();
        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(state.error_kind, Some("ServiceUnavailable"));
        assert!(state.last_error.is_some());
        assert!(matches!(
            session.download_report(),
            Err(Error::NoReportAvailable)
        ));

        // a failed session can start again
        assert!(session.prepare_run("coffee").is_ok());
    }

    #[tokio::test]
    async fn test_search_failure_reaches_terminal_state() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_text(r#"{"search_queries": ["q1"]}"#);
        provider.push_text(r#"{"title": "Empty", "report": "Nothing found."}"#);
        let session = controller(provider, StaticSearch::failing());

        session.start_run("coffee").await.unwrap();
        let state = session.progress();
        assert_eq!(state.status, RunStatus::Completed);
        assert!(state.facts.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_search_key_fails_run() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_text(r#"{"search_queries": ["q1"]}"#);
        let session = controller(provider.clone(), StaticSearch::rejecting_key());

        let result = session.start_run("coffee").await;
        assert!(matches!(result, Err(Error::Configuration(_))));

        let state = session.progress();
        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(state.error_kind, Some("ConfigurationError"));
        assert!(!state.has_report());
        assert!(
            state
                .last_error
                .as_deref()
                .is_some_and(|e| e.contains("rejected the API key"))
        );
        assert_eq!(provider.remaining(), 0);
    }

    #[test]
    fn test_manager_sessions() {
        let manager = SessionManager::new(runtime(Arc::new(ScriptedProvider::new()), search()));

        let a = manager.get_or_create("a");
        let again = manager.get_or_create("a");
        assert!(Arc::ptr_eq(&a, &again));
        manager.get_or_create("b");
        assert_eq!(manager.active_count(), 2);

        assert_eq!(manager.cleanup_expired(), 0);
        assert!(manager.remove("b"));
        assert!(manager.get("b").is_none());
    }

    #[test]
    fn test_manager_expiry_keeps_running_sessions() {
        let manager =
            SessionManager::new(runtime(Arc::new(ScriptedProvider::new()), search())).with_ttl(-1);
        manager.get_or_create("idle");
        manager.get_or_create("busy").prepare_run("coffee").unwrap();

        assert_eq!(manager.cleanup_expired(), 1);
        assert!(manager.get("busy").is_some());
    }
}
