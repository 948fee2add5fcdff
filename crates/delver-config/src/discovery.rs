//! Locating and layering config files.
//!
//! Two layers are read, lowest precedence first:
//!
//! | Layer   | Path                                               |
//! |---------|----------------------------------------------------|
//! | user    | `$DELVER_CONFIG_DIR/config.toml`, else the platform config dir |
//! | project | `./delver.toml` (or under the given project dir)   |
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use crate::{ConfigError, DelverConfig, Result};

/// Project-local config filename.
pub const PROJECT_CONFIG_FILE: &str = "delver.toml";

const USER_CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "DELVER_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    User,
    Project,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Layer::User => "user",
            Layer::Project => "project",
        })
    }
}

/// One candidate file and whether it contributed to the merged config.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: Layer,
    pub path: PathBuf,
    pub loaded: bool,
}

/// Merged configuration plus a record of where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DelverConfig,
    /// Every candidate, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Non-fatal problems: unreadable layers, plaintext keys.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the files that were actually merged.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

/// Discover and merge config for `project_dir` (the working directory when `None`).
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], reading the user layer from `config_dir` when given
/// instead of the environment or platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user = config_dir
        .map(|d| d.join(USER_CONFIG_FILE))
        .or_else(xdg_config_path);
    let project = match project_dir {
        Some(dir) => dir.join(PROJECT_CONFIG_FILE),
        None => PathBuf::from(PROJECT_CONFIG_FILE),
    };

    let candidates = user
        .map(|p| (Layer::User, p))
        .into_iter()
        .chain(std::iter::once((Layer::Project, project)));

    let mut config = DelverConfig::new();
    let mut warnings = Vec::new();
    let sources = candidates
        .map(|(layer, path)| {
            let loaded = merge_layer(&mut config, layer, &path, &mut warnings);
            ConfigSource {
                layer,
                path,
                loaded,
            }
        })
        .collect();

    config.validate()?;
    if let Some(warning) = plaintext_key_warning(&config) {
        warnings.push(warning);
    }

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Parse a single config file without any layering.
pub fn load_config_file(path: &Path) -> Result<DelverConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    DelverConfig::from_toml(&text)
}

/// `config.toml` inside [`xdg_config_dir`].
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Delver's user config directory. `DELVER_CONFIG_DIR` wins when non-empty.
pub fn xdg_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join("delver")),
    }
}

/// Merge `path` into `config` if it exists. A file that fails to parse is
/// reported in `warnings` and skipped.
fn merge_layer(
    config: &mut DelverConfig,
    layer: Layer,
    path: &Path,
    warnings: &mut Vec<String>,
) -> bool {
    if !path.is_file() {
        return false;
    }
    match load_config_file(path) {
        Ok(parsed) => {
            tracing::debug!(%layer, path = %path.display(), "Merged config layer");
            config.merge(parsed);
            true
        }
        Err(e) => {
            warnings.push(format!("Failed to load {} config {}: {}", layer, path.display(), e));
            false
        }
    }
}

fn plaintext_key_warning(config: &DelverConfig) -> Option<String> {
    let llm = config.llm.as_ref().filter(|l| l.has_plaintext_api_key())?;
    let hint = llm
        .api_key_env_var()
        .map(|var| format!(" ({})", var))
        .unwrap_or_default();
    Some(format!(
        "[llm] config contains a plaintext API key. Prefer the environment variable{} instead.",
        hint
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    use crate::{Backend, DialectName};

    /// A user dir and a project dir, both empty.
    fn dirs_pair() -> (TempDir, TempDir) {
        (TempDir::new().unwrap(), TempDir::new().unwrap())
    }

    fn load(user: &TempDir, project: &TempDir) -> Result<LoadedConfig> {
        load_config_with_options(Some(project.path()), Some(user.path()))
    }

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        let dir = TempDir::new().unwrap();
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var(CONFIG_DIR_ENV, dir.path()) };
        assert_eq!(xdg_config_dir().unwrap(), dir.path());
        assert_eq!(xdg_config_path().unwrap(), dir.path().join("config.toml"));

        unsafe { std::env::set_var(CONFIG_DIR_ENV, "") };
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with("delver/config.toml"));
        }
        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
    }

    #[test]
    fn test_load_config_file_errors() {
        let missing = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::ReadFile { .. }));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[llm\nbackend = ").unwrap();
        assert!(matches!(
            load_config_file(&path).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let (user, project) = dirs_pair();
        let loaded = load(&user, &project).unwrap();

        assert!(loaded.config.llm.is_none());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.sources.len(), 2);
        assert_eq!(loaded.sources[0].layer, Layer::User);
        assert_eq!(loaded.sources[1].layer, Layer::Project);
    }

    #[test]
    fn test_project_layer_replaces_whole_sections() {
        let (user, project) = dirs_pair();
        fs::write(
            user.path().join("config.toml"),
            "[llm]\nbackend = \"groq\"\nmodel = \"base-model\"\n\n[exploration]\nmax_tool_calls = 30\n",
        )
        .unwrap();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[exploration]\ndialect = \"reasoning\"\n",
        )
        .unwrap();

        let loaded = load(&user, &project).unwrap();
        let llm = loaded.config.llm.as_ref().unwrap();
        assert_eq!(llm.backend, Some(Backend::Groq));
        assert_eq!(llm.model.as_deref(), Some("base-model"));

        // the user's max_tool_calls does not survive the project section
        let exploration = loaded.config.exploration();
        assert_eq!(exploration.dialect, DialectName::Reasoning);
        assert_eq!(exploration.max_tool_calls, 20);
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_broken_layer_is_a_warning() {
        let (user, project) = dirs_pair();
        fs::write(user.path().join("config.toml"), "[llm\nbroken").unwrap();

        let loaded = load(&user, &project).unwrap();
        assert!(loaded.config.llm.is_none());
        assert!(!loaded.sources[0].loaded);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].starts_with("Failed to load user config"));
    }

    #[test]
    fn test_invalid_values_fail_load() {
        let (user, project) = dirs_pair();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[exploration.balance]\nlower_threshold = 0.9\nupper_threshold = 0.5\n",
        )
        .unwrap();

        assert!(matches!(
            load(&user, &project).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_plaintext_key_warning() {
        let (user, project) = dirs_pair();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[llm]\nbackend = \"openai\"\napi_key = \"sk-test\"\n",
        )
        .unwrap();

        let loaded = load(&user, &project).unwrap();
        assert!(
            loaded
                .warnings
                .iter()
                .any(|w| w.contains("plaintext API key") && w.contains("OPENAI_API_KEY"))
        );
    }
}
