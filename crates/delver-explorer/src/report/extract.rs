//! Code piece extraction, one extractor per tool family.
//!
//! Extraction is best-effort: a section that does not parse yields nothing
//! and never affects other sections.

use std::sync::LazyLock;

use regex::Regex;

use super::{CodePiece, PieceType};
use crate::types::ToolExecution;

static RESULT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Result \d+: (.+)").expect("result id regex is valid"));

static BOLD_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \*\*(.+)\*\*").expect("bold item regex is valid"));

static METHODS_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Methods in (?:class|interface) '([^']+)'").expect("methods header regex is valid")
});

/// Pulls code pieces out of one tool's results.
pub trait PieceExtractor: Send + Sync {
    /// Whether this extractor handles `tool`.
    fn handles(&self, tool: &str) -> bool;

    fn extract(&self, execution: &ToolExecution) -> Vec<CodePiece>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────────────────────────────────────

/// `read_file`: the first fenced block as a file piece.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileReadPieces;

impl PieceExtractor for FileReadPieces {
    fn handles(&self, tool: &str) -> bool {
        tool == "read_file"
    }

    fn extract(&self, execution: &ToolExecution) -> Vec<CodePiece> {
        let Some(path) = execution.param_str("filePath") else {
            return Vec::new();
        };
        match first_code_block(&execution.result) {
            Some(code) if !code.is_empty() => vec![
                CodePiece::new(path, PieceType::File, code, detect_language(path))
                    .with_file_path(path),
            ],
            _ => Vec::new(),
        }
    }
}

/// `find_methods`: one signature piece per listed method.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodListPieces;

impl PieceExtractor for MethodListPieces {
    fn handles(&self, tool: &str) -> bool {
        tool == "find_methods"
    }

    fn extract(&self, execution: &ToolExecution) -> Vec<CodePiece> {
        let Some(class_name) = METHODS_HEADER_RE
            .captures(&execution.result)
            .map(|c| c[1].to_string())
        else {
            return Vec::new();
        };

        execution
            .result
            .lines()
            .filter_map(|line| line.trim().strip_prefix("- "))
            .filter(|rest| rest.contains('(') && rest.contains(')'))
            .map(|signature| {
                let signature = signature.trim();
                let id = format!("{}#{}", class_name, method_name(signature));
                CodePiece::new(id, PieceType::MethodSignature, signature, "java")
                    .with_class_name(&class_name)
            })
            .collect()
    }
}

/// `search_code` / `find_similar`: each fenced block paired with the
/// identifier label that precedes it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchResultPieces;

impl PieceExtractor for SearchResultPieces {
    fn handles(&self, tool: &str) -> bool {
        matches!(tool, "search_code" | "find_similar")
    }

    fn extract(&self, execution: &ToolExecution) -> Vec<CodePiece> {
        let text = &execution.result;
        let blocks = all_code_blocks(text);
        let ids = element_ids(text);

        ids.into_iter()
            .zip(blocks)
            .map(|(id, code)| {
                let language = file_path_for(text, &id)
                    .map(|p| detect_language(&p))
                    .unwrap_or("java");
                let mut piece = CodePiece::new(&id, detect_code_type(&code), code, language);
                piece.file_path = file_path_for(text, &id);
                piece
            })
            .collect()
    }
}

/// `get_class_info`: the structural description, ranked below a full class body.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassInfoPieces;

impl PieceExtractor for ClassInfoPieces {
    fn handles(&self, tool: &str) -> bool {
        tool == "get_class_info"
    }

    fn extract(&self, execution: &ToolExecution) -> Vec<CodePiece> {
        execution
            .param_str("className")
            .map(|class_name| {
                vec![
                    CodePiece::new(class_name, PieceType::ClassInfo, &execution.result, "text")
                        .with_class_name(class_name),
                ]
            })
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Text helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Fenced blocks in order, bodies trimmed. The opening line (with its
/// language tag) is skipped. A block closes only on a bare line of at least
/// as many backticks as opened it, so a longer outer fence can wrap content
/// holding fences of its own. Unterminated blocks are dropped.
pub(crate) fn all_code_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut fence: Option<usize> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        let ticks = trimmed.bytes().take_while(|&b| b == b'`').count();
        match fence {
            None => {
                if ticks >= 3 {
                    fence = Some(ticks);
                    body.clear();
                }
            }
            Some(width) if ticks >= width && trimmed[ticks..].trim().is_empty() => {
                blocks.push(body.join("\n").trim().to_string());
                fence = None;
            }
            Some(_) => body.push(line),
        }
    }
    blocks
}

/// A backtick fence longer than any backtick run in `content` (at least three).
pub fn fence_for(content: &str) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

pub(crate) fn first_code_block(text: &str) -> Option<String> {
    all_code_blocks(text).into_iter().next()
}

/// Identifier labels: `Result N: <id>` lines, or `- **<id>**` lines whose id
/// looks qualified.
fn element_ids(text: &str) -> Vec<String> {
    let mut ids = Vec::new();
    for line in text.lines() {
        if let Some(caps) = RESULT_ID_RE.captures(line) {
            ids.push(caps[1].trim().to_string());
        } else if let Some(caps) = BOLD_ITEM_RE.captures(line) {
            let id = caps[1].trim();
            if id.contains('#') || id.contains('.') {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

/// The path on the first `File:` line after the line naming `id`.
fn file_path_for(text: &str, id: &str) -> Option<String> {
    let mut found = false;
    for line in text.lines() {
        if line.contains(id) {
            found = true;
        } else if found && let Some(idx) = line.find("File:") {
            return Some(line[idx + "File:".len()..].trim().to_string());
        }
    }
    None
}

/// Method name from a signature: last token before `(`, without `*`.
fn method_name(signature: &str) -> String {
    match signature.find('(') {
        Some(paren) if paren > 0 => signature[..paren]
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .replace('*', ""),
        _ => signature.to_string(),
    }
}

/// Bullet items (`- x`) for relationship results, skipping "None found".
pub(crate) fn bullet_items(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.contains("None found"))
        .filter_map(|line| line.trim().strip_prefix("- "))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Bold bullet items (`- **x**`) for caller and implementation results.
pub(crate) fn bold_items(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_end();
            let inner = line.strip_prefix("- **")?.strip_suffix("**")?;
            let name = inner.split("**").next().unwrap_or(inner).trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Fence language for a file path.
pub fn detect_language(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, e)| e).unwrap_or_default();
    match ext {
        "java" => "java",
        "kt" => "kotlin",
        "xml" => "xml",
        "json" => "json",
        "rs" => "rust",
        "py" => "python",
        "ts" => "typescript",
        "js" => "javascript",
        "go" => "go",
        _ => "text",
    }
}

/// Guess what kind of code a snippet is.
pub fn detect_code_type(code: &str) -> PieceType {
    let braces = code.contains('{');
    let parens = code.contains('(') && code.contains(')');
    if code.contains("class ") && braces {
        PieceType::Class
    } else if code.contains("interface ") && braces {
        PieceType::Interface
    } else if parens && !braces {
        PieceType::MethodSignature
    } else if parens {
        PieceType::Method
    } else {
        PieceType::Code
    }
}
