//! Search capabilities: content search and file lookup by name.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::{Value, json};

use super::Workspace;
use crate::capability::{Capability, CapabilityOutput, ParamExt};
use crate::error::Result;
use crate::report::{detect_language, fence_for};

/// Lines of context shown on each side of a match.
const CONTEXT_LINES: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Search Code
// ─────────────────────────────────────────────────────────────────────────────

/// Case-insensitive content search across the workspace.
#[derive(Debug, Clone)]
pub struct SearchCode {
    workspace: Arc<Workspace>,
}

#[derive(Debug)]
struct Hit {
    path: String,
    line: usize,
    snippet: String,
}

impl SearchCode {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Compile `query` as a regex, falling back to a literal match.
    fn matcher(query: &str) -> std::result::Result<Regex, regex::Error> {
        RegexBuilder::new(query)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                RegexBuilder::new(&regex::escape(query))
                    .case_insensitive(true)
                    .build()
            })
    }

    fn search_file(&self, path: &Path, regex: &Regex, limit: usize, hits: &mut Vec<Hit>) {
        let Ok(content) = std::fs::read_to_string(path) else {
            return;
        };
        let lines: Vec<&str> = content.lines().collect();
        let display = self.workspace.display(path);

        let mut last_shown = None;
        for (idx, line) in lines.iter().enumerate() {
            if hits.len() >= limit {
                return;
            }
            if !regex.is_match(line) {
                continue;
            }
            // one hit per context window
            if last_shown.is_some_and(|end| idx <= end) {
                continue;
            }
            let start = idx.saturating_sub(CONTEXT_LINES);
            let end = (idx + CONTEXT_LINES).min(lines.len() - 1);
            hits.push(Hit {
                path: display.clone(),
                line: idx + 1,
                snippet: lines[start..=end].join("\n"),
            });
            last_shown = Some(end);
        }
    }
}

#[async_trait]
impl Capability for SearchCode {
    fn name(&self) -> &str {
        "search_code"
    }

    fn description(&self) -> &str {
        "Search source files for text or a regex (case-insensitive). Returns matching snippets with file and line."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text or regex to search for"
                },
                "maxResults": {
                    "type": "integer",
                    "description": "Maximum number of matches to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<CapabilityOutput> {
        let query = params.required_str("query")?;
        if query.trim().is_empty() {
            return Ok(CapabilityOutput::error("Search query is empty"));
        }
        let limit = (params.optional_u64("maxResults", self.workspace.max_results() as u64)
            as usize)
            .clamp(1, self.workspace.max_results());

        let regex = match Self::matcher(query) {
            Ok(r) => r,
            Err(e) => return Ok(CapabilityOutput::error(format!("Invalid search query: {}", e))),
        };
        let root = self.workspace.root().to_path_buf();
        let mut hits = Vec::new();
        let mut files_searched = 0usize;

        for entry in self.workspace.walk(&root, true) {
            if hits.len() >= limit {
                break;
            }
            if !entry.file_type().is_file() || !self.workspace.is_searchable(entry.path()) {
                continue;
            }
            files_searched += 1;
            self.search_file(entry.path(), &regex, limit, &mut hits);
        }

        tracing::debug!(query, files_searched, hits = hits.len(), "Code search finished");

        if hits.is_empty() {
            return Ok(CapabilityOutput::text(format!(
                "No matches found for '{}'",
                query
            )));
        }

        let mut out = format!("Found {} matches for '{}':\n\n", hits.len(), query);
        for (i, hit) in hits.iter().enumerate() {
            let fence = fence_for(&hit.snippet);
            out.push_str(&format!(
                "### Result {}: {}:{}\nFile: {}\n{}{}\n{}\n{}\n\n",
                i + 1,
                hit.path,
                hit.line,
                hit.path,
                fence,
                detect_language(&hit.path),
                hit.snippet,
                fence
            ));
        }
        Ok(CapabilityOutput::text(out.trim_end())
            .with_metadata(json!({ "matches": hits.len(), "files_searched": files_searched })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Find By Name
// ─────────────────────────────────────────────────────────────────────────────

/// Locates files whose stem equals a class or file name.
#[derive(Debug, Clone)]
pub struct FindByName {
    workspace: Arc<Workspace>,
}

impl FindByName {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Capability for FindByName {
    fn name(&self) -> &str {
        "find_by_name"
    }

    fn description(&self) -> &str {
        "Find files by class or file name. Accepts a simple name ('Leaderboard') or a qualified one ('com.game.Leaderboard')."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Class or file name, with or without package"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, params: Value) -> Result<CapabilityOutput> {
        let name = params.required_str("name")?.trim();
        // `com.game.Leaderboard` -> `Leaderboard`, `Leaderboard.java` -> `Leaderboard`
        let stem = match name.rsplit_once('.') {
            Some((head, tail)) if tail.chars().next().is_some_and(char::is_lowercase) => {
                head.rsplit('.').next().unwrap_or(head)
            }
            Some((_, tail)) => tail,
            None => name,
        };

        let root = self.workspace.root().to_path_buf();
        let found: Vec<String> = self
            .workspace
            .walk(&root, true)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().file_stem().is_some_and(|s| s.to_string_lossy() == stem))
            .take(self.workspace.max_results())
            .map(|e| self.workspace.display(e.path()))
            .collect();

        if found.is_empty() {
            return Ok(CapabilityOutput::text(format!(
                "No files found matching '{}'",
                name
            )));
        }

        let mut out = format!("Files matching '{}':\n", name);
        for path in &found {
            out.push_str(&format!("- {}\n", path));
        }
        Ok(CapabilityOutput::text(out.trim_end()))
    }
}
