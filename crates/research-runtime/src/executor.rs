//! Agent executor for running tool loops
//!
//! The loop is:
//! 1. Call the model with the conversation and the agent's tools
//! 2. If it requested tool calls, execute them against the run context and loop
//! 3. Otherwise return its text
//!
//! Every tool call is recorded in the run transcript.

use research_core::{AgentRole, Error, Result, RunContext, TranscriptEntry};
use research_llm::{
    CompletionRequest, ContentBlock, LLMProvider, Message, StopReason, ToolDefinition,
};
use research_tools::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for one agent's executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Bound on model calls per agent turn
    pub max_iterations: usize,
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
    /// Request a JSON object response
    pub json_mode: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: "gpt-4o-mini".to_string(),
            system_prompt: None,
            max_tokens: 4096,
            temperature: Some(0.7),
            json_mode: false,
        }
    }
}

/// Runs the model/tool loop for one agent role
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
    role: AgentRole,
}

impl AgentExecutor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: ExecutorConfig,
        role: AgentRole,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
            role,
        }
    }

    pub fn builder(role: AgentRole) -> AgentExecutorBuilder {
        AgentExecutorBuilder::new(role)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run the loop for one user message.
    ///
    /// Model errors abort the turn. Tool errors are sent back to the model as
    /// error results. When `max_iterations` is exhausted the last text the
    /// model produced is returned.
    pub async fn run(&self, user_message: String, context: &mut RunContext) -> Result<String> {
        let mut conversation = vec![Message::user(user_message)];
        let tools = self.tool_registry.definitions();
        let mut last_text = String::new();

        for iteration in 1..=self.config.max_iterations {
            info!(
                agent = %self.role,
                run_id = %context.run_id(),
                iteration,
                max_iterations = self.config.max_iterations,
                tool_count = tools.len(),
                "Agent iteration started"
            );

            let request = self.build_request(conversation.clone(), tools.clone());
            let response = self.provider.complete(request).await?;

            info!(
                agent = %self.role,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM response received"
            );

            let text = response.message.text().unwrap_or_default();
            if !text.is_empty() {
                last_text.clone_from(&text);
            }

            if response.message.has_tool_uses() {
                let results = self.execute_tools(&response.message, context).await;
                conversation.push(response.message);
                conversation.push(Message::tool_results(results));
                continue;
            }

            match response.stop_reason {
                StopReason::MaxTokens => warn!(agent = %self.role, "Response truncated by token limit"),
                StopReason::ContentFilter => warn!(agent = %self.role, "Response filtered by provider"),
                StopReason::EndTurn | StopReason::ToolUse => {}
            }

            let preview: String = text.chars().take(200).collect();
            debug!(agent = %self.role, response_preview = %preview, "Agent completed");
            return Ok(text);
        }

        warn!(
            agent = %self.role,
            max_iterations = self.config.max_iterations,
            "Max iterations reached, returning last output"
        );
        Ok(last_text)
    }

    fn build_request(&self, messages: Vec<Message>, tools: Vec<ToolDefinition>) -> CompletionRequest {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens)
            .tools(tools)
            .json_mode(self.config.json_mode);

        if let Some(system) = &self.config.system_prompt {
            builder = builder.system(system.clone());
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        builder.build()
    }

    async fn execute_tools(&self, message: &Message, context: &mut RunContext) -> Vec<ContentBlock> {
        let mut results = Vec::new();

        for (id, name, input) in message.tool_uses() {
            let Some(tool) = self.tool_registry.get(name) else {
                warn!(agent = %self.role, tool_name = %name, "Model requested unknown tool");
                context.record(TranscriptEntry::ToolCall {
                    agent: self.role,
                    tool: name.to_string(),
                    is_error: true,
                });
                results.push(Message::tool_result_block(
                    id,
                    format!("Error: unknown tool '{name}'"),
                    true,
                ));
                continue;
            };

            let start = Instant::now();
            let outcome = tool.execute(input.clone(), context).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            context.record(TranscriptEntry::ToolCall {
                agent: self.role,
                tool: name.to_string(),
                is_error: outcome.is_err(),
            });

            match outcome {
                Ok(value) => {
                    info!(agent = %self.role, tool_name = %name, duration_ms, "Tool execution succeeded");
                    results.push(Message::tool_result_block(id, value.to_string(), false));
                }
                Err(e) => {
                    warn!(agent = %self.role, tool_name = %name, duration_ms, error = %e, "Tool execution failed");
                    results.push(Message::tool_result_block(id, format!("Error: {e}"), true));
                }
            }
        }

        results
    }
}

/// Builder for [`AgentExecutor`]
pub struct AgentExecutorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
    role: AgentRole,
}

impl AgentExecutorBuilder {
    pub fn new(role: AgentRole) -> Self {
        Self {
            provider: None,
            tool_registry: Arc::new(ToolRegistry::new()),
            config: ExecutorConfig::default(),
            role,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = registry;
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn json_mode(mut self, enabled: bool) -> Self {
        self.config.json_mode = enabled;
        self
    }

    pub fn build(self) -> Result<AgentExecutor> {
        let provider = self
            .provider
            .ok_or_else(|| Error::InitializationFailed("Provider not set".to_string()))?;

        Ok(AgentExecutor::new(
            provider,
            self.tool_registry,
            self.config,
            self.role,
        ))
    }
}
