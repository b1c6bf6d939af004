//! Research plan and final report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plan produced by the Planner Agent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub topic: String,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

impl ResearchPlan {
    /// Queries to run, falling back to the topic itself when the plan has none
    pub fn effective_queries(&self) -> Vec<String> {
        let queries: Vec<String> = self
            .search_queries
            .iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if queries.is_empty() {
            vec![self.topic.clone()]
        } else {
            queries
        }
    }
}

/// Structured report as returned by the Editor Agent, before rendering
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub outline: Vec<String>,
    #[serde(default)]
    pub report: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub word_count: usize,
}

/// The final report of a run.
///
/// Immutable once built: the Markdown is rendered exactly once in
/// [`Report::from_draft`] and served unchanged to both the page and the
/// download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    title: String,
    outline: Vec<String>,
    body: String,
    sources: Vec<String>,
    word_count: usize,
    created_at: DateTime<Utc>,
    markdown: String,
}

impl Report {
    /// Build a report from a draft, filling in a title and word count when missing
    pub fn from_draft(draft: ReportDraft, fallback_title: &str) -> Self {
        let title = match draft.title.trim() {
            "" => fallback_title.trim().to_string(),
            t => t.to_string(),
        };
        let body = draft.report.trim().to_string();
        let outline: Vec<String> = draft
            .outline
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let sources: Vec<String> = draft
            .sources
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let word_count = if draft.word_count == 0 {
            count_words(&body)
        } else {
            draft.word_count
        };

        let markdown = render_markdown(&title, &outline, &body, &sources, word_count);

        Self {
            title,
            outline,
            body,
            sources,
            word_count,
            created_at: Utc::now(),
            markdown,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn outline(&self) -> &[String] {
        &self.outline
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The rendered Markdown document
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// Download file name derived from the title
    pub fn file_name(&self) -> String {
        let stem: String = self
            .title
            .trim()
            .chars()
            .filter_map(|c| match c {
                ' ' => Some('_'),
                c if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') => Some(c),
                _ => None,
            })
            .collect();
        let stem = stem.trim_matches(|c| c == '.' || c == '_');

        if stem.is_empty() {
            "report.md".to_string()
        } else {
            format!("{stem}.md")
        }
    }
}

/// Count whitespace-separated words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn render_markdown(
    title: &str,
    outline: &[String],
    body: &str,
    sources: &[String],
    word_count: usize,
) -> String {
    let mut md = format!("# {title}\n\n*Word count: {word_count}*\n");

    if !outline.is_empty() {
        md.push_str("\n## Outline\n\n");
        for item in outline {
            md.push_str(&format!("- {item}\n"));
        }
    }

    if !body.is_empty() {
        md.push('\n');
        md.push_str(body);
        md.push('\n');
    }

    if !sources.is_empty() {
        md.push_str("\n## Sources\n\n");
        for source in sources {
            md.push_str(&format!("- {source}\n"));
        }
    }

    md
}
