//! `save_important_fact` tool

use crate::Tool;
use async_trait::async_trait;
use research_core::{Error, Fact, Result, RunContext};
use research_llm::tools::schema;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct SaveFactParams {
    fact: String,
    #[serde(default)]
    source: Option<String>,
}

/// Appends one fact to the run's fact store per call.
///
/// The fact text is stored exactly as the model sent it, duplicates included.
#[derive(Debug, Default, Clone, Copy)]
pub struct SaveFactTool;

impl SaveFactTool {
    pub const NAME: &'static str = "save_important_fact";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for SaveFactTool {
    async fn execute(&self, params: Value, context: &mut RunContext) -> Result<Value> {
        let params: SaveFactParams = serde_json::from_value(params)
            .map_err(|e| Error::InvalidInput(format!("save_important_fact: {e}")))?;

        let fact = Fact::new(params.fact, params.source);
        let saved_at = fact.saved_at.clone();
        let total = context.save_fact(fact);

        Ok(json!({
            "status": "saved",
            "saved_at": saved_at,
            "total_facts": total,
        }))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Save one important fact discovered during research. Call once per fact."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "fact": schema::string("The fact to save, stated in one or two sentences"),
                "source": schema::string("URL or name of the source, if known"),
            }),
            &["fact"],
        )
    }
}
