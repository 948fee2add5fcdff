//! Tool-call protocol parser.
//!
//! Extracts [`ToolCall`]s from free-form model text. The primary form is a
//! fenced block (optionally tagged `json`) holding either one call object or
//! an array of them:
//!
//! ````text
//! ```json
//! {"tool": "search_code", "parameters": {"query": "leaderboard"}, "reasoning": "..."}
//! ```
//! ````
//!
//! When no fenced block yields a call, inline calls such as
//! `Tool: find_by_name("Leaderboard")` are accepted as a fallback.
//!
//! Parsing is pure: malformed blocks are skipped and the worst case is an
//! empty list.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::types::{Parameters, ToolCall};

static FENCED_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?i:json)?\s*(.+?)\s*```").expect("fenced block regex is valid")
});

static INLINE_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Tool:\s*(\w+)\s*\(([^)]+)\)").expect("inline call regex is valid")
});

/// Stateless parser for the tool-call protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCallParser;

impl ToolCallParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse every tool call in `text`, in order of appearance.
    pub fn parse(&self, text: &str) -> Vec<ToolCall> {
        let mut calls = Vec::new();

        for caps in FENCED_BLOCK_RE.captures_iter(text) {
            let body = caps[1].trim();
            match serde_json::from_str::<Value>(body) {
                Ok(Value::Object(obj)) => calls.extend(call_from_object(&obj)),
                Ok(Value::Array(items)) => calls.extend(
                    items
                        .iter()
                        .filter_map(Value::as_object)
                        .filter_map(call_from_object),
                ),
                Ok(_) => {}
                Err(e) => {
                    tracing::trace!(error = %e, "Skipping non-JSON fenced block");
                }
            }
        }

        if calls.is_empty() {
            calls.extend(parse_inline(text));
        }

        calls
    }
}

/// Build a call from a JSON object carrying `tool` and `parameters`.
fn call_from_object(obj: &Map<String, Value>) -> Option<ToolCall> {
    let tool = obj.get("tool")?.as_str()?.trim();
    if tool.is_empty() {
        return None;
    }
    let parameters = obj.get("parameters")?.as_object()?.clone();

    let text_field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };

    Some(ToolCall {
        tool: tool.to_string(),
        parameters,
        reasoning: text_field(&["reasoning"]),
        deep_reasoning: text_field(&["deepreasoning", "deep_reasoning"]),
    })
}

/// Parse `Tool: name(args)` calls.
fn parse_inline(text: &str) -> Vec<ToolCall> {
    INLINE_CALL_RE
        .captures_iter(text)
        .map(|caps| ToolCall::new(&caps[1], parse_inline_args(&caps[2])))
        .collect()
}

/// Map inline arguments onto parameter names.
///
/// `key=value` pairs map directly. Positional argument 0 is `query`;
/// positional 1 is `maxResults` when numeric, otherwise `param2`.
fn parse_inline_args(args: &str) -> Parameters {
    let mut params = Parameters::new();

    for (i, part) in args.split(',').enumerate() {
        let part = strip_quotes(part.trim());

        if let Some((key, value)) = part.split_once('=') {
            params.insert(
                key.trim().to_string(),
                Value::String(strip_quotes(value.trim()).to_string()),
            );
            continue;
        }

        match i {
            0 => {
                params.insert("query".to_string(), Value::String(part.to_string()));
            }
            1 => match part.parse::<i64>() {
                Ok(n) => {
                    params.insert("maxResults".to_string(), Value::from(n));
                }
                Err(_) => {
                    params.insert("param2".to_string(), Value::String(part.to_string()));
                }
            },
            _ => {}
        }
    }

    params
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}
