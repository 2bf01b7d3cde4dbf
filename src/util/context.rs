//! Global context for quay operations.
//!
//! Provides centralized access to the working directory, the user-wide
//! quay directory and output settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::workspace::{find_workspace_root, WorkspaceError};
use crate::util::config::global_config_dir;

/// Where quay runs from and how it reports.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    /// User-wide quay directory (`~/.quay/`)
    home: Option<PathBuf>,
    color: bool,
}

impl GlobalContext {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(GlobalContext {
            cwd,
            home: global_config_dir(),
            color: true,
        })
    }

    /// Run as if started from `cwd`.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        Ok(GlobalContext {
            cwd,
            ..Self::new()?
        })
    }

    /// Use a different home directory (tests, sandboxes).
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn set_color(&mut self, enabled: bool) {
        self.color = enabled;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// `config.toml` in the home directory, if there is one.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.home().map(|home| home.join("config.toml"))
    }

    /// Whether diagnostics are printed with ANSI colors.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        self.cwd.join(path)
    }

    /// Find the workspace root, searching upward from the working directory.
    pub fn find_workspace_root(&self) -> Result<PathBuf, WorkspaceError> {
        find_workspace_root(&self.cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
        assert!(ctx.color());
        if let Some(home) = ctx.home() {
            assert!(home.ends_with(".quay"));
        }
    }

    #[test]
    fn test_find_workspace_root_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("MODULE.bazel"), "").unwrap();
        let nested = tmp.path().join("packages/web");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested).unwrap();
        assert_eq!(ctx.find_workspace_root().unwrap(), tmp.path());
    }

    #[test]
    fn test_resolve_path() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf())
            .unwrap()
            .with_home(None);

        assert_eq!(ctx.resolve_path(Path::new("app")), tmp.path().join("app"));
        assert_eq!(ctx.resolve_path(Path::new("/abs")), Path::new("/abs"));
        assert!(ctx.config_path().is_none());
    }
}
