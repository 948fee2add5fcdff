//! Built-in capabilities.
//!
//! Local capabilities read a directory tree directly; remote capabilities
//! forward to a tool server over HTTP. Either set can back a
//! [`CapabilityRegistry`].

mod code_access;
mod file;
mod remote;
mod search;

pub use code_access::LocalCodeAccess;
pub use file::{ListFiles, ReadFile};
pub use remote::{RemoteCapability, RemoteToolClient, RemoteToolInfo};
pub use search::{FindByName, SearchCode};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use crate::capability::CapabilityRegistry;
use crate::error::{ExplorerError, Result};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "build", "dist", "out", "vendor"];

const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "o", "a", "lib", "png", "jpg", "jpeg", "gif", "bmp", "ico",
    "webp", "mp3", "mp4", "avi", "mov", "mkv", "wav", "flac", "zip", "tar", "gz", "bz2", "xz", "7z",
    "rar", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "wasm", "pyc", "class", "jar",
];

// ─────────────────────────────────────────────────────────────────────────────
// Workspace
// ─────────────────────────────────────────────────────────────────────────────

/// The directory tree local capabilities operate on.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    max_file_bytes: u64,
    max_results: usize,
    max_depth: usize,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: 512 * 1024,
            max_results: 50,
            max_depth: 20,
        }
    }

    /// Files larger than this are neither read nor searched.
    pub fn with_max_file_bytes(mut self, max: u64) -> Self {
        self.max_file_bytes = max;
        self
    }

    /// Cap on search and listing results.
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Resolve `path` (absolute or root-relative) to a canonical path
    /// inside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let base = self
            .root
            .canonicalize()
            .map_err(|e| ExplorerError::capability(format!("Invalid root directory: {}", e)))?;

        let candidate = Path::new(path);
        let full = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            base.join(candidate)
        };

        let canonical = full
            .canonicalize()
            .map_err(|_| ExplorerError::capability(format!("Path not found: {}", path)))?;

        if !canonical.starts_with(&base) {
            return Err(ExplorerError::capability(
                "Path is outside the workspace root",
            ));
        }
        Ok(canonical)
    }

    /// Path relative to the root, for display.
    pub fn display(&self, path: &Path) -> String {
        let base = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        path.strip_prefix(&base)
            .or_else(|_| path.strip_prefix(&self.root))
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Walk files under `dir`, skipping hidden entries and build output.
    pub fn walk(&self, dir: &Path, recursive: bool) -> impl Iterator<Item = DirEntry> {
        let depth = if recursive { self.max_depth } else { 1 };
        WalkDir::new(dir)
            .max_depth(depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e))
            .filter_map(|e| e.ok())
    }

    /// Whether a file is worth reading as text.
    pub fn is_searchable(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if BINARY_EXTENSIONS.contains(&ext.as_str()) {
                return false;
            }
        }
        match path.metadata() {
            Ok(meta) => meta.is_file() && meta.len() <= self.max_file_bytes,
            Err(_) => false,
        }
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref())
}

/// Registry with every local capability over `workspace`.
pub fn local_registry(workspace: Workspace) -> CapabilityRegistry {
    let workspace = Arc::new(workspace);
    let mut registry = CapabilityRegistry::new();
    registry.register(ReadFile::new(workspace.clone()));
    registry.register(ListFiles::new(workspace.clone()));
    registry.register(SearchCode::new(workspace.clone()));
    registry.register(FindByName::new(workspace));
    registry
}
