//! Configuration system for the Delver code explorer.
//!
//! Provides TOML-based configuration with:
//! - A default LLM section (`[llm]`) with API key resolution (config → env var)
//! - Exploration budgets and heuristics (`[exploration]`, `[exploration.balance]`,
//!   `[exploration.coverage]`)
//! - Tool settings (`[tools]`) and logging (`[logging]`)
//! - Config file layering (user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, Layer, LoadedConfig, PROJECT_CONFIG_FILE, load_config, load_config_file,
    load_config_with_options, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
