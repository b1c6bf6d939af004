//! Request handlers

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use research_core::Error;
use research_workflow::{ReportDownload, SessionController, SessionState};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

/// Header carrying the browser-generated session id
pub const SESSION_HEADER: &str = "X-Session-ID";

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub topic: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub state: SessionState,
    pub has_report: bool,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub file_name: String,
    pub markdown: String,
}

fn session_id(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ApiError(Error::InvalidInput(format!("missing {SESSION_HEADER} header"))))
}

fn session(state: &AppState, headers: &HeaderMap) -> ApiResult<Arc<SessionController>> {
    let id = session_id(headers)?;
    Ok(state.sessions.get_or_create(&id))
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.sessions.active_count(),
    }))
}

/// Start a research run in the background
///
/// Validation and the in-progress check happen before the response, so an
/// empty topic or a second concurrent run is reported synchronously.
pub async fn start_research(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<StartRequest>,
) -> ApiResult<(StatusCode, Json<StartResponse>)> {
    let session = session(&state, &headers)?;
    let topic = session.prepare_run(&request.topic)?;

    info!(session_id = %session.id(), %topic, "Spawning research run");
    let runner = Arc::clone(&session);
    let run_topic = topic.clone();
    tokio::spawn(async move {
        // outcome is committed to the session state either way
        if let Err(e) = runner.execute(run_topic).await {
            debug!(session_id = %runner.id(), error = %e, "Background run ended with error");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            session_id: session.id().to_string(),
            topic,
            status: "running",
        }),
    ))
}

pub async fn research_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<StatusResponse>> {
    let snapshot = session(&state, &headers)?.progress();
    Ok(Json(StatusResponse {
        has_report: snapshot.has_report(),
        state: snapshot,
    }))
}

pub async fn report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<ReportResponse>> {
    let ReportDownload { file_name, content } = session(&state, &headers)?.download_report()?;
    Ok(Json(ReportResponse {
        file_name,
        markdown: content,
    }))
}

/// The report as a `.md` attachment
pub async fn download_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let download = session(&state, &headers)?.download_report()?;

    let disposition = format!("attachment; filename=\"{}\"", download.file_name);
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"report.md\""));

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/markdown; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.content,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_runtime::ResearchRuntime;
    use research_runtime::testing::{ScriptedProvider, StaticSearch, hit};

    fn app_state(provider: Arc<ScriptedProvider>) -> Arc<AppState> {
        let runtime = ResearchRuntime::builder()
            .provider(provider)
            .search(Arc::new(
                StaticSearch::new().with_fallback(vec![hit("A", "https://a", "content")]),
            ))
            .build()
            .unwrap();
        Arc::new(AppState::new(Arc::new(runtime)))
    }

    fn headers(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_str(id).unwrap());
        headers
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn script_lisbon(provider: &ScriptedProvider) {
        provider.push_text(r#"{"search_queries": ["best coffee shops Lisbon"]}"#);
        provider.push_tool_calls(vec![
            ("save_important_fact", json!({"fact": "F1", "source": "https://a"})),
            ("save_important_fact", json!({"fact": "F2"})),
            ("save_important_fact", json!({"fact": "F3"})),
        ]);
        provider.push_text("saved");
        provider.push_text(
            json!({
                "title": "Best Coffee Shops in Lisbon",
                "outline": ["Overview"],
                "report": "F1, F2 and F3 stand out.",
                "sources": ["https://a"],
                "word_count": 0
            })
            .to_string(),
        );
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let Html(page) = index().await;
        assert!(page.contains(SESSION_HEADER));
        assert!(page.contains("/api/research"));
    }

    #[tokio::test]
    async fn test_missing_session_header() {
        let state = app_state(Arc::new(ScriptedProvider::new()));
        let err = research_status(State(state), HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_topic_rejected() {
        let provider = Arc::new(ScriptedProvider::new());
        let state = app_state(provider.clone());

        let err = start_research(
            State(state),
            headers("s1"),
            Json(StartRequest {
                topic: "   ".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_start_while_running_conflicts() {
        let state = app_state(Arc::new(ScriptedProvider::new()));
        state
            .sessions
            .get_or_create("s1")
            .prepare_run("coffee")
            .unwrap();

        let err = start_research(
            State(state),
            headers("s1"),
            Json(StartRequest {
                topic: "tea".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_download_before_run_is_not_found() {
        let state = app_state(Arc::new(ScriptedProvider::new()));
        let err = download_report(State(state.clone()), headers("s1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let Json(status) = research_status(State(state), headers("s1")).await.unwrap();
        assert!(!status.has_report);
    }

    #[tokio::test]
    async fn test_download_matches_rendered_report() {
        let provider = Arc::new(ScriptedProvider::new());
        script_lisbon(&provider);
        let state = app_state(provider);

        let session = state.sessions.get_or_create("s1");
        session.start_run("best coffee shops in Lisbon").await.unwrap();

        let Json(rendered) = report(State(state.clone()), headers("s1")).await.unwrap();
        let response = download_report(State(state.clone()), headers("s1"))
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Best_Coffee_Shops_in_Lisbon.md\""
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/markdown; charset=utf-8"
        );
        assert_eq!(body_text(response).await, rendered.markdown);
        for fact in ["F1", "F2", "F3"] {
            assert!(rendered.markdown.contains(fact));
        }

        let Json(status) = research_status(State(state), headers("s1")).await.unwrap();
        assert!(status.has_report);
        assert_eq!(status.state.progress, 100);
        assert_eq!(status.state.facts.len(), 3);
    }

    #[tokio::test]
    async fn test_start_runs_in_background() {
        let provider = Arc::new(ScriptedProvider::new());
        script_lisbon(&provider);
        let state = app_state(provider);

        let (code, Json(started)) = start_research(
            State(state.clone()),
            headers("s1"),
            Json(StartRequest {
                topic: "best coffee shops in Lisbon".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(code, StatusCode::ACCEPTED);
        assert_eq!(started.topic, "best coffee shops in Lisbon");

        let session = state.sessions.get("s1").unwrap();
        for _ in 0..200 {
            if session.status() != research_workflow::RunStatus::Running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(session.status(), research_workflow::RunStatus::Completed);
        assert!(session.download_report().is_ok());
    }

    #[tokio::test]
    async fn test_health_counts_sessions() {
        let state = app_state(Arc::new(ScriptedProvider::new()));
        state.sessions.get_or_create("a");
        let Json(body) = health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 1);
    }
}
