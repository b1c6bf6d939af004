//! Facts collected during a research run

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Source recorded when the caller does not name one
pub const UNSPECIFIED_SOURCE: &str = "Not specified";

/// A single fact saved by the Search Agent.
///
/// The text is stored exactly as given. The source and save time are
/// metadata only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub text: String,
    pub source: String,
    /// Wall-clock save time, `HH:MM:SS`
    pub saved_at: String,
}

impl Fact {
    /// Create a fact stamped with the current local time
    pub fn new(text: impl Into<String>, source: Option<String>) -> Self {
        let source = source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNSPECIFIED_SOURCE.to_string());

        Self {
            text: text.into(),
            source,
            saved_at: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Append-only, ordered store of the facts of one run.
///
/// There is no removal or deduplication; a fresh store is created for each run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FactStore {
    facts: Vec<Fact>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fact and return the new length of the store
    pub fn append(&mut self, fact: Fact) -> usize {
        self.facts.push(fact);
        self.facts.len()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }

    pub fn as_slice(&self) -> &[Fact] {
        &self.facts
    }

    pub fn into_vec(self) -> Vec<Fact> {
        self.facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order_and_length() {
        let mut store = FactStore::new();
        let texts = ["F1", "F2", "F1", "", "F3"];

        for (i, text) in texts.iter().enumerate() {
            let len = store.append(Fact::new(*text, None));
            assert_eq!(len, i + 1);
        }

        assert_eq!(store.len(), texts.len());
        let stored: Vec<&str> = store.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(stored, texts);
    }

    #[test]
    fn test_no_deduplication() {
        let mut store = FactStore::new();
        store.append(Fact::new("same", None));
        store.append(Fact::new("same", None));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_source_defaults() {
        let fact = Fact::new("Lisbon has many cafés", None);
        assert_eq!(fact.source, UNSPECIFIED_SOURCE);

        let fact = Fact::new("x", Some("   ".to_string()));
        assert_eq!(fact.source, UNSPECIFIED_SOURCE);

        let fact = Fact::new("x", Some("https://example.com".to_string()));
        assert_eq!(fact.source, "https://example.com");
    }

    #[test]
    fn test_timestamp_format() {
        let fact = Fact::new("x", None);
        assert_eq!(fact.saved_at.len(), 8);
        assert_eq!(fact.saved_at.chars().filter(|c| *c == ':').count(), 2);
    }
}
