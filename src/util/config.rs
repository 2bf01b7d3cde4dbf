//! Configuration file support for quay.
//!
//! Quay reads two configuration file locations:
//! - Global: `~/.quay/config.toml` - User-wide defaults
//! - Project: `<workspace>/.quay/config.toml` - Workspace-specific overrides
//!
//! Project config takes precedence over global config. Per-directory
//! generation settings live in build file directives, not here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::directive::{DEFAULT_BUILD_FILE_NAMES, DEFAULT_DIRECTIVE_PREFIX};
use crate::parser::session::DEFAULT_PARSER_LIFETIME;

/// Directories never descended into while collecting sources.
pub const DEFAULT_SKIP_DIRS: &[&str] = &["node_modules", ".git"];

/// Quay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External parser settings
    pub parser: ParserConfig,

    /// Generation settings
    pub generate: GenerateConfig,
}

/// External import parser.
///
/// Without a command the built-in scanner is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Program to run (a bare name is looked up in PATH)
    pub command: Option<String>,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Upper bound on the parser process lifetime, in seconds
    pub lifetime_secs: Option<u64>,
}

/// Workspace generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Build file names, in lookup order
    pub build_file_names: Vec<String>,

    /// Directive comment prefix (e.g. `gazelle:`)
    pub directive_prefix: Option<String>,

    /// Repository name used in generated labels
    pub repo_name: Option<String>,

    /// Directory names skipped while walking
    pub skip_dirs: Vec<String>,
}

impl ParserConfig {
    pub fn lifetime(&self) -> Duration {
        self.lifetime_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PARSER_LIFETIME)
    }
}

impl GenerateConfig {
    pub fn build_file_names(&self) -> Vec<String> {
        if self.build_file_names.is_empty() {
            DEFAULT_BUILD_FILE_NAMES.iter().map(|s| s.to_string()).collect()
        } else {
            self.build_file_names.clone()
        }
    }

    pub fn directive_prefix(&self) -> &str {
        self.directive_prefix
            .as_deref()
            .unwrap_or(DEFAULT_DIRECTIVE_PREFIX)
    }

    pub fn repo_name(&self) -> &str {
        self.repo_name.as_deref().unwrap_or("")
    }

    pub fn skip_dirs(&self) -> Vec<String> {
        if self.skip_dirs.is_empty() {
            DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect()
        } else {
            self.skip_dirs.clone()
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Parser settings; a new command brings its own arguments.
        if other.parser.command.is_some() {
            self.parser.command = other.parser.command;
            self.parser.args = other.parser.args;
        } else if !other.parser.args.is_empty() {
            self.parser.args = other.parser.args;
        }
        if other.parser.lifetime_secs.is_some() {
            self.parser.lifetime_secs = other.parser.lifetime_secs;
        }

        // Generate settings
        if !other.generate.build_file_names.is_empty() {
            self.generate.build_file_names = other.generate.build_file_names;
        }
        if other.generate.directive_prefix.is_some() {
            self.generate.directive_prefix = other.generate.directive_prefix;
        }
        if other.generate.repo_name.is_some() {
            self.generate.repo_name = other.generate.repo_name;
        }
        if !other.generate.skip_dirs.is_empty() {
            self.generate.skip_dirs = other.generate.skip_dirs;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`.quay/config.toml`)
/// 2. Global config (`~/.quay/config.toml`)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global quay config directory (`~/.quay`).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".quay"))
}

/// Get the project config path (`.quay/config.toml`).
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".quay").join("config.toml")
}
