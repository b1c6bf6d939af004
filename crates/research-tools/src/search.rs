//! Web search adapter
//!
//! [`SearchProvider`] is the seam to the external search service;
//! [`TavilySearch`] is the production implementation and [`WebSearchTool`]
//! exposes a provider to the model as the `web_search` tool.

use crate::Tool;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use research_core::{Error, Result, RunContext};
use research_llm::tools::schema;
use research_utils::SearchSettings;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const SEARCH_TIMEOUT_SECS: u64 = 30;

/// One search result snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// External web search capability. Stateless.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query and return the raw result snippets
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Render hits as plain text for the model
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] {}\nURL: {}\n{}\n",
                i + 1,
                hit.title.trim(),
                hit.url.trim(),
                hit.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tavily search API client
pub struct TavilySearch {
    client: Client,
    api_key: String,
    api_base: String,
    max_results: usize,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl TavilySearch {
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(Error::Configuration("TAVILY_API_KEY is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::InitializationFailed(format!("search client: {e}")))?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            max_results: settings.max_results,
        })
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.api_base)
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    #[instrument(skip(self), fields(max_results = self.max_results))]
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let body = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: "basic",
        };

        let response = self
            .client
            .post(self.search_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Search request rejected");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Error::Configuration(format!("search provider rejected the API key: {text}"))
                }
                _ => Error::ServiceUnavailable(format!("search provider returned {status}: {text}")),
            });
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("unreadable search response: {e}")))?;

        debug!(hits = parsed.results.len(), "Search completed");
        Ok(parsed.results)
    }
}

#[derive(Debug, Deserialize)]
struct WebSearchParams {
    query: String,
}

/// Exposes a [`SearchProvider`] to the model as `web_search`
#[derive(Clone)]
pub struct WebSearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Run a query directly, bypassing the JSON tool interface
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.provider.search(query).await
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    async fn execute(&self, params: Value, _context: &mut RunContext) -> Result<Value> {
        let params: WebSearchParams = serde_json::from_value(params)
            .map_err(|e| Error::InvalidInput(format!("web_search: {e}")))?;

        let hits = self.search(&params.query).await?;
        if hits.is_empty() {
            return Ok(json!({ "results": "No results found." }));
        }
        Ok(json!({ "results": format_hits(&hits) }))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search the web and return result snippets with their URLs."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({ "query": schema::string("The search query") }),
            &["query"],
        )
    }
}
