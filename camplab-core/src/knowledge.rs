//! Platform knowledge base
//!
//! A JSON document describing the platform, searched by free text to pick
//! snippets that travel with each message as assistant context. The
//! built-in copy is compiled into the library; `session.knowledge_path`
//! swaps in another document.

use std::path::Path;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

const BUILTIN_KNOWLEDGE: &str = include_str!("../data/camp-knowledge.json");

/// One matching string from the knowledge document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeSnippet {
    /// Dotted location, with `[i]` for array items (e.g. `contract.supportedAssets[2]`)
    pub path: String,
    pub content: String,
    /// Key that owns the string
    pub context: String,
}

/// Searchable knowledge document
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    root: Map<String, Value>,
}

impl KnowledgeBase {
    /// The knowledge base shipped with the library
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_KNOWLEDGE)
    }

    /// Load a knowledge document from disk
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Knowledge(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse a knowledge document; the top level must be an object
    pub fn from_json(content: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(root) => Ok(Self { root }),
            other => Err(Error::Knowledge(format!(
                "top level must be an object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Names of the top-level sections
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// A top-level section by name
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.root.get(name)
    }

    /// Value at a dotted path (`lab.solutionDevelopment.phases`)
    pub fn lookup(&self, dotted: &str) -> Option<&Value> {
        let mut parts = dotted.split('.');
        let first = parts.next()?;
        parts.try_fold(self.root.get(first)?, |value, key| value.get(key))
    }

    /// Every string leaf containing any whitespace-separated term of `query`
    ///
    /// Matching is case-insensitive. Results follow document order
    /// (object keys as written in the source JSON).
    pub fn search(&self, query: &str) -> Vec<KnowledgeSnippet> {
        let lowered = query.to_lowercase();
        let terms: Vec<&str> = lowered.split_whitespace().collect();
        let mut results = Vec::new();
        if terms.is_empty() {
            return results;
        }
        search_object(&self.root, "", &terms, &mut results);
        results
    }

    /// Context bundle for a collaborative request about `query`
    pub fn collaborative_context(&self, query: &str, limit: usize) -> Value {
        let relevant: Vec<KnowledgeSnippet> = self.search(query).into_iter().take(limit).collect();
        json!({
            "projectOverview": self.section("project").cloned().unwrap_or(Value::Null),
            "relevantKnowledge": relevant,
            "labCapabilities": self.lookup("lab.capabilities").cloned().unwrap_or(Value::Null),
            "solutionProcess": self
                .lookup("lab.solutionDevelopment")
                .cloned()
                .unwrap_or(Value::Null),
            "partnershipMode": true,
        })
    }
}

fn matches(text: &str, terms: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    terms.iter().any(|term| lowered.contains(term))
}

fn search_object(
    object: &Map<String, Value>,
    path: &str,
    terms: &[&str],
    results: &mut Vec<KnowledgeSnippet>,
) {
    for (key, value) in object {
        let current = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };

        match value {
            Value::String(text) => {
                if matches(text, terms) {
                    results.push(KnowledgeSnippet {
                        path: current,
                        content: text.clone(),
                        context: key.clone(),
                    });
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", current, index);
                    match item {
                        Value::String(text) if matches(text, terms) => {
                            results.push(KnowledgeSnippet {
                                path: item_path,
                                content: text.clone(),
                                context: key.clone(),
                            });
                        }
                        Value::Object(inner) => search_object(inner, &item_path, terms, results),
                        _ => {}
                    }
                }
            }
            Value::Object(inner) => search_object(inner, &current, terms, results),
            _ => {}
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
