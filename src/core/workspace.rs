//! Workspace - the source tree generation runs over.
//!
//! The workspace root is the nearest directory containing one of the
//! host build tool's workspace marker files. Quay's own settings for the
//! workspace are the merged global and project config files.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::util::config::{load_config, project_config_path, Config};
use crate::util::fs::to_slash;
use crate::util::GlobalContext;

/// Files marking a workspace root.
pub const WORKSPACE_FILE_NAMES: &[&str] = &["MODULE.bazel", "WORKSPACE.bazel", "WORKSPACE"];

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(
        "could not find a workspace root in `{}` or any parent directory\n\
         help: create a `MODULE.bazel` or `WORKSPACE` file at the workspace root",
        dir.display()
    )]
    NotFound { dir: PathBuf },

    #[error("`{}` is outside the workspace `{}`", path.display(), root.display())]
    OutsideWorkspace { path: PathBuf, root: PathBuf },
}

/// Find the workspace marker file in `dir`.
pub fn find_workspace_file(dir: &Path) -> Option<PathBuf> {
    WORKSPACE_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Search upward from `start` for the workspace root.
pub fn find_workspace_root(start: &Path) -> Result<PathBuf, WorkspaceError> {
    let mut current = start.to_path_buf();
    loop {
        if find_workspace_file(&current).is_some() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(WorkspaceError::NotFound {
                dir: start.to_path_buf(),
            });
        }
    }
}

/// A workspace and its quay configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Open the workspace rooted at `root`, loading global and project
    /// configuration.
    pub fn new(root: &Path, ctx: &GlobalContext) -> Self {
        let config = load_config(ctx.config_path().as_deref(), &project_config_path(root));
        Self::with_config(root, config)
    }

    pub fn with_config(root: &Path, config: Config) -> Self {
        Workspace {
            root: root.to_path_buf(),
            config,
        }
    }

    /// Get the workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build file names, in lookup order.
    pub fn build_file_names(&self) -> Vec<String> {
        self.config.generate.build_file_names()
    }

    pub fn directive_prefix(&self) -> &str {
        self.config.generate.directive_prefix()
    }

    /// Repository name used in generated labels.
    pub fn repo_name(&self) -> &str {
        self.config.generate.repo_name()
    }

    pub fn skip_dirs(&self) -> Vec<String> {
        self.config.generate.skip_dirs()
    }

    /// Slash-separated path of `path` relative to the workspace root
    /// (`""` for the root itself).
    pub fn rel_path(&self, path: &Path) -> Result<String, WorkspaceError> {
        path.strip_prefix(&self.root)
            .map(to_slash)
            .map_err(|_| WorkspaceError::OutsideWorkspace {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })
    }
}
