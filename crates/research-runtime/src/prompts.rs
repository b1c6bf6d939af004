//! Instruction prompts for the research agents, rendered with MiniJinja

use minijinja::{Environment, Value};
use research_core::{Error, Fact, Result};

pub const PLANNER_SYSTEM: &str = "planner_system";
pub const PLANNER_USER: &str = "planner_user";
pub const SEARCH_SYSTEM: &str = "search_system";
pub const SEARCH_USER: &str = "search_user";
pub const EDITOR_SYSTEM: &str = "editor_system";
pub const EDITOR_USER: &str = "editor_user";

const TEMPLATES: &[(&str, &str)] = &[
    (
        PLANNER_SYSTEM,
        "You are a research planner. Given a topic, generate 5 to 8 diverse, precise \
web search queries and a short list of focus areas.\n\
Respond with a JSON object of the form \
{\"topic\": string, \"search_queries\": [string], \"focus_areas\": [string]}.",
    ),
    (PLANNER_USER, "Research topic: {{ topic }}"),
    (
        SEARCH_SYSTEM,
        "You are a research agent. You receive web search results for one query.\n\
1. Read the results.\n\
2. For every important insight call save_important_fact exactly once, passing the fact \
and its source URL.\n\
3. If the results are thin you may call web_search with a sharper query.\n\
When you are done, summarise what you found in Markdown.",
    ),
    (
        SEARCH_USER,
        "Topic: {{ topic }}\n\
{% if focus_areas %}Focus areas: {{ focus_areas | join(\", \") }}\n{% endif %}\
Query: {{ query }}\n\n\
Search results:\n{{ results }}",
    ),
    (
        EDITOR_SYSTEM,
        "Compile a well-structured research report, ensuring clarity and completeness. \
Base it on the collected facts and cite their sources.\n\
Respond with a JSON object with the keys: \
\"title\" (string), \"outline\" (list of section headings), \
\"report\" (the full report body in Markdown), \
\"sources\" (list of URLs or source names), \"word_count\" (integer).",
    ),
    (
        EDITOR_USER,
        "Topic: {{ topic }}\n\
{% if focus_areas %}Focus areas: {{ focus_areas | join(\", \") }}\n{% endif %}\
\nCollected facts ({{ facts | length }}):\n\
{% for fact in facts %}{{ loop.index }}. {{ fact.text }} (source: {{ fact.source }})\n\
{% else %}No facts were collected. Write the best report you can and state clearly \
that no sources were found.\n{% endfor %}",
    ),
];

/// Compiled prompt templates shared by all agents
pub struct Prompts {
    env: Environment<'static>,
}

impl Prompts {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| Error::InitializationFailed(format!("prompt '{name}': {e}")))?;
        }
        Ok(Self { env })
    }

    /// Render a template by name
    pub fn render(&self, name: &str, ctx: Value) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|t| t.render(ctx))
            .map_err(|e| Error::ProcessingFailed(format!("rendering prompt '{name}': {e}")))
    }

    /// Render a template that takes no variables
    pub fn text(&self, name: &str) -> Result<String> {
        self.render(name, minijinja::context! {})
    }

    pub fn planner_user(&self, topic: &str) -> Result<String> {
        self.render(PLANNER_USER, minijinja::context! { topic })
    }

    pub fn search_user(
        &self,
        topic: &str,
        focus_areas: &[String],
        query: &str,
        results: &str,
    ) -> Result<String> {
        self.render(
            SEARCH_USER,
            minijinja::context! { topic, focus_areas, query, results },
        )
    }

    pub fn editor_user(&self, topic: &str, focus_areas: &[String], facts: &[Fact]) -> Result<String> {
        self.render(
            EDITOR_USER,
            minijinja::context! { topic, focus_areas, facts },
        )
    }
}
