//! Tool trait definition

use async_trait::async_trait;
use research_core::{Result, RunContext};
use research_llm::ToolDefinition;
use serde_json::Value;

/// A function the model can call during an agent turn
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with JSON parameters matching [`Tool::input_schema`]
    async fn execute(&self, params: Value, context: &mut RunContext) -> Result<Value>;

    /// Unique name within a registry, as the model sees it
    fn name(&self) -> &str;

    /// Tells the model when to use the tool
    fn description(&self) -> &str;

    /// JSON Schema of the parameters
    fn input_schema(&self) -> Value;

    /// Definition sent to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}
