//! OpenAI-compatible chat completions provider
//!
//! Serves both the public OpenAI API (and compatible servers) and Azure
//! OpenAI deployments. The two differ only in URL layout and auth header:
//!
//! - OpenAI: `POST {api_base}/chat/completions`, `Authorization: Bearer <key>`
//! - Azure: `POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=..`,
//!   `api-key: <key>`
//!
//! ```no_run
//! use research_llm::{CompletionRequest, LLMProvider, Message};
//! use research_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OpenAIConfig::azure("key", "https://my-res.openai.azure.com", "gpt-4o", "2024-10-21");
//! let provider = OpenAIProvider::with_config(config)?;
//!
//! let request = CompletionRequest::builder("gpt-4o")
//!     .add_message(Message::user("Hello!"))
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{:?}", response.message.text());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, Result, Role, StopReason, TokenUsage, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use research_utils::{LlmBackend, LlmSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Where requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAIEndpoint {
    OpenAi {
        api_base: String,
    },
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
    },
}

/// Configuration for [`OpenAIProvider`]
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub endpoint: OpenAIEndpoint,
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Public OpenAI API with default base URL
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: OpenAIEndpoint::OpenAi {
                api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            },
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Azure OpenAI deployment
    pub fn azure(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: OpenAIEndpoint::Azure {
                endpoint: endpoint.into(),
                deployment: deployment.into(),
                api_version: api_version.into(),
            },
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Build from the application's LLM settings
    pub fn from_settings(settings: &LlmSettings) -> Self {
        let config = match &settings.backend {
            LlmBackend::OpenAi { api_key, api_base } => {
                Self::new(api_key.clone()).with_api_base(api_base.clone())
            }
            LlmBackend::Azure {
                api_key,
                endpoint,
                deployment,
                api_version,
            } => Self::azure(
                api_key.clone(),
                endpoint.clone(),
                deployment.clone(),
                api_version.clone(),
            ),
        };
        config.with_timeout(settings.timeout_secs)
    }

    /// Point an OpenAI config at a compatible server, e.g. `http://localhost:1234/v1`.
    /// Has no effect on Azure configs.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        if let OpenAIEndpoint::OpenAi { api_base: base } = &mut self.endpoint {
            *base = api_base.into();
        }
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Full chat completions URL
    pub fn chat_completions_url(&self) -> String {
        match &self.endpoint {
            OpenAIEndpoint::OpenAi { api_base } => {
                format!("{}/chat/completions", api_base.trim_end_matches('/'))
            }
            OpenAIEndpoint::Azure {
                endpoint,
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
        }
    }

    fn auth_header(&self) -> (&'static str, String) {
        match self.endpoint {
            OpenAIEndpoint::OpenAi { .. } => ("Authorization", format!("Bearer {}", self.api_key)),
            OpenAIEndpoint::Azure { .. } => ("api-key", self.api_key.clone()),
        }
    }
}

/// OpenAI / Azure OpenAI chat completions provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError("API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Self::with_config(OpenAIConfig::from_settings(settings))
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, provider = self.name()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = self.config.chat_completions_url();
        debug!(%url, messages = request.messages.len(), "Sending chat completion request");

        let body = OpenAIRequest {
            model: request.model.clone(),
            messages: build_openai_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request.tools.as_deref().map(convert_tools),
            response_format: request.json_mode.then(|| ResponseFormat {
                format_type: "json_object",
            }),
        };

        let (header, value) = self.config.auth_header();
        let response = self
            .client
            .post(&url)
            .header(header, value)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Chat completion request failed");

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(request.model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let parsed: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        let usage = parsed.usage.unwrap_or_default();
        debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("none"),
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Received chat completion"
        );

        Ok(CompletionResponse {
            message: parse_openai_response(choice.message)?,
            stop_reason: map_stop_reason(choice.finish_reason.as_deref()),
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    fn name(&self) -> &'static str {
        match self.config.endpoint {
            OpenAIEndpoint::OpenAi { .. } => "openai",
            OpenAIEndpoint::Azure { .. } => "azure-openai",
        }
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAIMessage {
    fn text(role: &'static str, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    tool_type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

// Conversions

/// The system prompt goes first in the messages array
fn build_openai_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    system
        .map(|sys| OpenAIMessage::text("system", sys))
        .into_iter()
        .chain(messages.into_iter().flat_map(convert_message))
        .collect()
}

/// One message may expand into several, since each tool result is its own `tool` message
fn convert_message(msg: Message) -> Vec<OpenAIMessage> {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };

    match msg.content {
        Some(MessageContent::Text(text)) => vec![OpenAIMessage::text(role, text)],
        Some(MessageContent::Blocks(blocks)) => convert_blocks(role, blocks),
        None => vec![OpenAIMessage::text(role, String::new())],
    }
}

fn convert_blocks(role: &'static str, blocks: Vec<ContentBlock>) -> Vec<OpenAIMessage> {
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();
    let mut tool_messages = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text } => texts.push(text),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(OpenAIToolCall {
                id,
                tool_type: function_type(),
                function: OpenAIFunctionCall {
                    name,
                    arguments: input.to_string(),
                },
            }),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => tool_messages.push(OpenAIMessage {
                role: "tool",
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(tool_use_id),
            }),
        }
    }

    let mut result = Vec::with_capacity(tool_messages.len() + 1);
    if !texts.is_empty() || !tool_calls.is_empty() {
        result.push(OpenAIMessage {
            role,
            content: (!texts.is_empty()).then(|| texts.join("\n")),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        });
    }
    result.extend(tool_messages);
    result
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
    tools
        .iter()
        .map(|tool| OpenAITool {
            tool_type: "function",
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

fn parse_openai_response(msg: OpenAIResponseMessage) -> Result<Message> {
    let mut blocks = Vec::new();

    if let Some(text) = msg.content.filter(|c| !c.is_empty()) {
        blocks.push(ContentBlock::Text { text });
    }

    for call in msg.tool_calls.unwrap_or_default() {
        let input = if call.function.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                LLMError::UnexpectedResponse(format!("Failed to parse tool arguments: {e}"))
            })?
        };

        blocks.push(ContentBlock::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    Ok(Message::assistant_blocks(blocks))
}

fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::MaxTokens,
        Some("tool_calls" | "function_call") => StopReason::ToolUse,
        Some("content_filter") => {
            debug!("Content filtered by provider safety systems");
            StopReason::ContentFilter
        }
        _ => StopReason::EndTurn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_openai_url_and_auth() {
        let config = OpenAIConfig::new("sk-test").with_api_base("http://localhost:1234/v1/");
        assert_eq!(
            config.chat_completions_url(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            config.auth_header(),
            ("Authorization", "Bearer sk-test".to_string())
        );
    }

    #[test]
    fn test_azure_url_and_auth() {
        let config = OpenAIConfig::azure(
            "azure-key",
            "https://my-res.openai.azure.com/",
            "gpt-4o",
            "2024-10-21",
        );
        assert_eq!(
            config.chat_completions_url(),
            "https://my-res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21"
        );
        assert_eq!(config.auth_header(), ("api-key", "azure-key".to_string()));

        // api_base override only applies to OpenAI
        let config = config.with_api_base("http://ignored");
        assert!(matches!(config.endpoint, OpenAIEndpoint::Azure { .. }));
    }

    #[test]
    fn test_from_settings() {
        let settings = LlmSettings {
            backend: LlmBackend::Azure {
                api_key: "k".to_string(),
                endpoint: "https://e.openai.azure.com".to_string(),
                deployment: "d".to_string(),
                api_version: "2024-10-21".to_string(),
            },
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        };

        let provider = OpenAIProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.name(), "azure-openai");
        assert_eq!(provider.config().timeout_secs, 30);
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = OpenAIProvider::with_config(OpenAIConfig::new("  "));
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }

    #[test]
    fn test_system_message_first() {
        let messages = build_openai_messages(
            Some("You are a planner".to_string()),
            vec![Message::user("coffee")],
        );
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content.as_deref(), Some("coffee"));

        let messages = build_openai_messages(None, vec![Message::system("Answer in JSON")]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content.as_deref(), Some("Answer in JSON"));
    }

    #[test]
    fn test_tool_results_become_tool_messages() {
        let msg = Message::tool_results(vec![
            Message::tool_result_block("call_1", "saved 1", false),
            Message::tool_result_block("call_2", "saved 2", false),
        ]);
        let converted = convert_message(msg);

        assert_eq!(converted.len(), 2);
        assert!(converted.iter().all(|m| m.role == "tool"));
        assert_eq!(converted[1].tool_call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn test_assistant_tool_call_round_trip_shape() {
        let msg = Message::assistant_blocks(vec![ContentBlock::ToolUse {
            id: "call_1".to_string(),
            name: "save_important_fact".to_string(),
            input: json!({"fact": "Lisbon has great coffee"}),
        }]);
        let converted = convert_message(msg);

        assert_eq!(converted.len(), 1);
        assert!(converted[0].content.is_none());
        let calls = converted[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "save_important_fact");
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&calls[0].function.arguments).unwrap()["fact"],
            "Lisbon has great coffee"
        );
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let raw = json!({
            "content": null,
            "tool_calls": [{
                "id": "call_9",
                "type": "function",
                "function": {"name": "save_important_fact", "arguments": "{\"fact\":\"F1\"}"}
            }]
        });
        let msg: OpenAIResponseMessage = serde_json::from_value(raw).unwrap();
        let message = parse_openai_response(msg).unwrap();

        assert_eq!(message.role, Role::Assistant);
        let uses = message.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].0, "call_9");
        assert_eq!(uses[0].2["fact"], "F1");
    }

    #[test]
    fn test_parse_response_bad_arguments() {
        let msg = OpenAIResponseMessage {
            content: None,
            tool_calls: Some(vec![OpenAIToolCall {
                id: "c".to_string(),
                tool_type: function_type(),
                function: OpenAIFunctionCall {
                    name: "x".to_string(),
                    arguments: "{not json".to_string(),
                },
            }]),
        };
        assert!(matches!(
            parse_openai_response(msg),
            Err(LLMError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_json_mode_serialization() {
        let body = OpenAIRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![],
            max_tokens: 10,
            temperature: None,
            tools: None,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason(Some("stop")), StopReason::EndTurn);
        assert_eq!(map_stop_reason(Some("length")), StopReason::MaxTokens);
        assert_eq!(map_stop_reason(Some("tool_calls")), StopReason::ToolUse);
        assert_eq!(
            map_stop_reason(Some("content_filter")),
            StopReason::ContentFilter
        );
        assert_eq!(map_stop_reason(None), StopReason::EndTurn);
    }
}
