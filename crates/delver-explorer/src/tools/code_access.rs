//! Full-source lookups for report enrichment, read from the workspace.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::Workspace;
use crate::report::{CodeAccess, CodePiece, PieceType, detect_language};

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("package regex is valid")
});

/// Field (or local) declarations whose type is a capitalized name.
static FIELD_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(?:(?:private|protected|public|static|final|transient|volatile)\s+)*([A-Z]\w*)(?:<[^>;=]*>)?(?:\[\])?\s+\w+\s*[=;]",
    )
    .expect("field type regex is valid")
});

/// Resolves `pkg.Class` and `Class#method` ids against source files whose
/// stem is the class name.
#[derive(Debug, Clone)]
pub struct LocalCodeAccess {
    workspace: Arc<Workspace>,
}

impl LocalCodeAccess {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// Source file for a possibly qualified class name. A path matching the
    /// package wins over a bare stem match.
    fn class_file(&self, class_name: &str) -> Option<PathBuf> {
        let simple = class_name.rsplit('.').next().unwrap_or(class_name);
        let package_dir = class_name
            .rsplit_once('.')
            .map(|(package, _)| package.replace('.', "/"));

        let root = self.workspace.root().to_path_buf();
        let candidates: Vec<PathBuf> = self
            .workspace
            .walk(&root, true)
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().file_stem().is_some_and(|s| s.to_string_lossy() == simple))
            .filter(|e| self.workspace.is_searchable(e.path()))
            .map(|e| e.into_path())
            .collect();

        if let Some(ref dir) = package_dir
            && let Some(found) = candidates
                .iter()
                .find(|p| self.workspace.display(p).contains(dir.as_str()))
        {
            return Some(found.clone());
        }
        candidates.into_iter().next()
    }

    /// Simple names of the types `source` declares as supertypes of
    /// `simple`, then its field types, in order of appearance.
    fn referenced_types(source: &str, simple: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            let name: String = name.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
            if name.starts_with(|c: char| c.is_ascii_uppercase())
                && name != simple
                && !names.contains(&name)
            {
                names.push(name);
            }
        };

        let declaration = format!(
            r"\b(?:class|interface|enum|record)\s+{}\b",
            regex::escape(simple)
        );
        if let Ok(re) = Regex::new(&declaration)
            && let Some(m) = re.find(source)
        {
            let header = source[m.end()..].split('{').next().unwrap_or_default();
            let mut in_supertypes = false;
            for token in header.split(|c: char| c.is_whitespace() || c == ',') {
                match token {
                    "extends" | "implements" => in_supertypes = true,
                    "" => {}
                    _ if in_supertypes => push(token.trim_start_matches('<')),
                    _ => {}
                }
            }
        }

        for caps in FIELD_TYPE_RE.captures_iter(source) {
            push(&caps[1]);
        }
        names
    }
}

#[async_trait]
impl CodeAccess for LocalCodeAccess {
    async fn full_code(&self, element_id: &str) -> Option<String> {
        let (class_name, member) = match element_id.split_once('#') {
            Some((class_name, member)) => (class_name, Some(member)),
            None => (element_id, None),
        };

        let path = self.class_file(class_name)?;
        let source = tokio::fs::read_to_string(&path).await.ok()?;

        match member {
            None => Some(source),
            Some(member) => {
                let name = member.split('(').next().unwrap_or(member).trim();
                method_source(&source, name)
            }
        }
    }

    /// Supertypes and field types of `class_name` that resolve to a file in
    /// the workspace. Library types never resolve and are skipped.
    async fn related_classes(&self, class_name: &str) -> Vec<CodePiece> {
        let simple = class_name.rsplit('.').next().unwrap_or(class_name);
        let Some(path) = self.class_file(class_name) else {
            return Vec::new();
        };
        let Ok(source) = tokio::fs::read_to_string(&path).await else {
            return Vec::new();
        };

        let mut pieces = Vec::new();
        for name in Self::referenced_types(&source, simple) {
            let Some(related_path) = self.class_file(&name) else {
                continue;
            };
            let Ok(code) = tokio::fs::read_to_string(&related_path).await else {
                continue;
            };
            let id = match PACKAGE_RE.captures(&code) {
                Some(caps) => format!("{}.{}", &caps[1], name),
                None => name.clone(),
            };
            let display = self.workspace.display(&related_path);
            pieces.push(
                CodePiece::new(id, PieceType::RelatedClass, code, detect_language(&display))
                    .with_class_name(name)
                    .with_file_path(display),
            );
        }
        tracing::debug!(class_name, related = pieces.len(), "Collected related classes");
        pieces
    }
}

/// Source of the first declaration of `name`, from the start of its line
/// through the matching closing brace. Abstract declarations yield their
/// signature line.
pub(crate) fn method_source(source: &str, name: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))).ok()?;

    for m in pattern.find_iter(source) {
        let line_start = source[..m.start()].rfind('\n').map_or(0, |i| i + 1);
        let prefix = source[line_start..m.start()].trim();
        // a call site, not a declaration
        if prefix.is_empty()
            || prefix.ends_with('.')
            || prefix.ends_with('=')
            || prefix.starts_with("return")
            || prefix.ends_with("new")
        {
            continue;
        }

        let after = &source[m.end()..];
        let Some(stop) = after.find(['{', ';']) else {
            continue;
        };
        let body_start = m.end() + stop;
        if source.as_bytes()[body_start] == b';' {
            let end = source[body_start..]
                .find('\n')
                .map_or(source.len(), |i| body_start + i);
            return Some(source[line_start..end].trim_end().to_string());
        }

        let mut depth = 0usize;
        for (offset, ch) in source[body_start..].char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let end = body_start + offset + 1;
                        return Some(source[line_start..end].to_string());
                    }
                }
                _ => {}
            }
        }
        return None;
    }
    None
}
