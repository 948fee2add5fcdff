//! File capabilities: reading files and listing directories.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::Workspace;
use crate::capability::{Capability, CapabilityOutput, ParamExt};
use crate::error::Result;
use crate::report::{detect_language, fence_for};

// ─────────────────────────────────────────────────────────────────────────────
// Read File
// ─────────────────────────────────────────────────────────────────────────────

/// Reads one file and returns it in a fenced block.
#[derive(Debug, Clone)]
pub struct ReadFile {
    workspace: Arc<Workspace>,
}

impl ReadFile {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Capability for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the full contents of a source file. Use after discovery to examine an implementation."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "Path of the file, absolute or relative to the project root"
                }
            },
            "required": ["filePath"]
        })
    }

    async fn execute(&self, params: Value) -> Result<CapabilityOutput> {
        let requested = params.required_str("filePath")?;
        let path = self.workspace.resolve(requested)?;

        if !path.is_file() {
            return Ok(CapabilityOutput::error(format!(
                "Path is not a file: {}",
                requested
            )));
        }
        if !self.workspace.is_searchable(&path) {
            return Ok(CapabilityOutput::error(format!(
                "File is binary or larger than {} bytes: {}",
                self.workspace.max_file_bytes(),
                requested
            )));
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return Ok(CapabilityOutput::error(format!("Failed to read file: {}", e))),
        };

        let display = self.workspace.display(&path);
        let lines = content.lines().count();
        let fence = fence_for(&content);
        Ok(CapabilityOutput::text(format!(
            "File: {}\nLines: {}\n\n{}{}\n{}\n{}",
            display,
            lines,
            fence,
            detect_language(&display),
            content.trim_end(),
            fence
        ))
        .with_metadata(json!({ "path": display, "lines": lines })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// List Files
// ─────────────────────────────────────────────────────────────────────────────

/// Lists a directory, optionally recursively and filtered by a glob.
#[derive(Debug, Clone)]
pub struct ListFiles {
    workspace: Arc<Workspace>,
}

impl ListFiles {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Capability for ListFiles {
    fn name(&self) -> &str {
        "list_files_in_directory"
    }

    fn description(&self) -> &str {
        "List files in a directory to understand package structure."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directoryPath": {
                    "type": "string",
                    "description": "Directory to list, relative to the project root. Defaults to the root."
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Whether to descend into subdirectories",
                    "default": false
                },
                "pattern": {
                    "type": "string",
                    "description": "Optional glob on file names (e.g. '*Test.java')"
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> Result<CapabilityOutput> {
        let requested = params.optional_str("directoryPath").unwrap_or(".");
        let recursive = params.optional_bool("recursive", false);
        let filter = match params.optional_str("pattern").map(glob::Pattern::new) {
            Some(Ok(p)) => Some(p),
            Some(Err(e)) => {
                return Ok(CapabilityOutput::error(format!("Invalid glob pattern: {}", e)));
            }
            None => None,
        };

        let dir = self.workspace.resolve(requested)?;
        if !dir.is_dir() {
            return Ok(CapabilityOutput::error(format!(
                "Path is not a directory: {}",
                requested
            )));
        }

        let mut entries = Vec::new();
        let mut truncated = false;
        for entry in self.workspace.walk(&dir, recursive) {
            if entry.depth() == 0 {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if let Some(ref glob) = filter
                && !entry.file_type().is_dir()
                && !glob.matches(&name)
            {
                continue;
            }
            if filter.is_some() && entry.file_type().is_dir() {
                continue;
            }
            if entries.len() >= self.workspace.max_results() {
                truncated = true;
                break;
            }

            let display = self.workspace.display(entry.path());
            if entry.file_type().is_dir() {
                entries.push(format!("- {}/", display));
            } else {
                entries.push(format!("- {}", display));
            }
        }

        if entries.is_empty() {
            return Ok(CapabilityOutput::text(format!(
                "No files found in {}",
                requested
            )));
        }

        let mut out = format!("Files in {} ({}):\n", requested, entries.len());
        out.push_str(&entries.join("\n"));
        if truncated {
            out.push_str("\n(more entries not shown)");
        }
        Ok(CapabilityOutput::text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Arc<Workspace>) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/main/java")).unwrap();
        fs::create_dir_all(dir.path().join("src/test/java")).unwrap();
        fs::write(
            dir.path().join("src/main/java/Leaderboard.java"),
            "public class Leaderboard {\n  int top() { return 1; }\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/test/java/LeaderboardTest.java"),
            "class LeaderboardTest {}\n",
        )
        .unwrap();
        let ws = Arc::new(Workspace::new(dir.path()));
        (dir, ws)
    }

    #[tokio::test]
    async fn test_read_file() {
        let (_dir, ws) = workspace();
        let out = ReadFile::new(ws)
            .execute(json!({"filePath": "src/main/java/Leaderboard.java"}))
            .await
            .unwrap();

        assert!(out.success);
        assert!(out.content.starts_with("File: src/main/java/Leaderboard.java\nLines: 3\n"));
        assert!(out.content.contains("```java\npublic class Leaderboard {"));
        assert!(out.content.ends_with("}\n```"));
    }

    #[tokio::test]
    async fn test_read_file_with_fenced_blocks() {
        let (dir, ws) = workspace();
        fs::write(
            dir.path().join("README.md"),
            "# Guide\n\n```bash\ncargo test\n```\n\nThen read the rest.\n",
        )
        .unwrap();

        let out = ReadFile::new(ws)
            .execute(json!({"filePath": "README.md"}))
            .await
            .unwrap();
        assert!(out.content.ends_with(
            "````text\n# Guide\n\n```bash\ncargo test\n```\n\nThen read the rest.\n````"
        ));
    }

    #[tokio::test]
    async fn test_read_file_errors() {
        let (_dir, ws) = workspace();
        let tool = ReadFile::new(ws);

        assert!(tool.execute(json!({})).await.is_err());
        assert!(tool.execute(json!({"filePath": "nope.java"})).await.is_err());

        let out = tool.execute(json!({"filePath": "src"})).await.unwrap();
        assert!(!out.success);
        assert!(out.error.unwrap().contains("not a file"));
    }

    #[tokio::test]
    async fn test_list_files() {
        let (_dir, ws) = workspace();
        let tool = ListFiles::new(ws);

        let out = tool.execute(json!({"directoryPath": "src"})).await.unwrap();
        assert!(out.content.contains("- src/main/"));
        assert!(out.content.contains("- src/test/"));
        assert!(!out.content.contains("Leaderboard.java"));

        let out = tool
            .execute(json!({"directoryPath": "src", "recursive": true, "pattern": "*Test.java"}))
            .await
            .unwrap();
        assert_eq!(
            out.content,
            "Files in src (1):\n- src/test/java/LeaderboardTest.java"
        );
    }

    #[tokio::test]
    async fn test_list_files_bad_glob() {
        let (_dir, ws) = workspace();
        let out = ListFiles::new(ws)
            .execute(json!({"pattern": "[unclosed"}))
            .await
            .unwrap();
        assert!(!out.success);
    }
}
