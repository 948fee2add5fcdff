//! Element extraction from tool executions.
//!
//! Typed extractors know what a specific tool's parameters mean. The
//! [`PatternExtractor`] scans raw result text for identifier-like tokens and
//! runs on every successful result as a fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::ToolExecution;

static QUALIFIED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([a-z]+\.)+[A-Z][a-zA-Z0-9]+\b").expect("qualified name regex is valid")
});

static MEMBER_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z0-9]+#[a-z][a-zA-Z0-9]+\b").expect("member ref regex is valid")
});

/// Kind of a discovered element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Class,
    Method,
    File,
}

/// A typed identifier pulled out of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Pulls typed elements out of a successful execution.
pub trait ElementExtractor: Send + Sync {
    fn extract(&self, execution: &ToolExecution) -> Vec<Element>;
}

/// The file a `read_file` call looked at.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadFileExtractor;

impl ElementExtractor for ReadFileExtractor {
    fn extract(&self, execution: &ToolExecution) -> Vec<Element> {
        if execution.tool_name != "read_file" {
            return Vec::new();
        }
        execution
            .param_str("filePath")
            .map(|p| vec![Element::new(p, ElementKind::File)])
            .unwrap_or_default()
    }
}

/// The class a `get_class_info` call described.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassInfoExtractor;

impl ElementExtractor for ClassInfoExtractor {
    fn extract(&self, execution: &ToolExecution) -> Vec<Element> {
        if execution.tool_name != "get_class_info" {
            return Vec::new();
        }
        execution
            .param_str("className")
            .map(|c| vec![Element::new(c, ElementKind::Class)])
            .unwrap_or_default()
    }
}

/// Regex scan for `pkg.Type` and `Type#member` tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternExtractor;

impl PatternExtractor {
    /// Scan arbitrary text. Order of first appearance, no duplicates.
    pub fn scan(text: &str) -> Vec<Element> {
        let mut found: Vec<Element> = Vec::new();
        let mut push = |id: &str, kind| {
            if !found.iter().any(|e| e.id == id) {
                found.push(Element::new(id, kind));
            }
        };

        for m in QUALIFIED_NAME_RE.find_iter(text) {
            push(m.as_str(), ElementKind::Class);
        }
        for m in MEMBER_REF_RE.find_iter(text) {
            push(m.as_str(), ElementKind::Method);
        }
        found
    }
}

impl ElementExtractor for PatternExtractor {
    fn extract(&self, execution: &ToolExecution) -> Vec<Element> {
        Self::scan(&execution.result)
    }
}
