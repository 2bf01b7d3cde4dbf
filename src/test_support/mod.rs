//! Test utilities for quay unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use quay::test_support::{MockParser, WorkspaceFixture};
//!
//! #[test]
//! fn test_example() {
//!     let ws = WorkspaceFixture::new()
//!         .build_file("app", "")
//!         .file("app/main.ts", "import { x } from '../lib/x';\n");
//!
//!     let parser = MockParser::new().module("app/main.ts", "../lib/x", 1);
//!     // Run generation against ws.workspace() with the mock parser...
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;

use crate::core::workspace::Workspace;
use crate::parser::{FileRecord, ImportParser, ModuleRef, ParseRequest, ParserError};
use crate::util::config::Config;

/// A throwaway workspace on disk.
///
/// The root carries a `MODULE.bazel` so workspace discovery finds it.
pub struct WorkspaceFixture {
    tmp: TempDir,
    config: Config,
}

impl WorkspaceFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        std::fs::write(tmp.path().join("MODULE.bazel"), "").expect("failed to write MODULE.bazel");
        WorkspaceFixture {
            tmp,
            config: Config::default(),
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Write a file relative to the root, creating parent directories.
    pub fn file(self, rel: &str, content: &str) -> Self {
        let path = self.tmp.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create directories");
        }
        std::fs::write(&path, content).expect("failed to write fixture file");
        self
    }

    /// Write `<dir>/BUILD.bazel`.
    pub fn build_file(self, dir: &str, content: &str) -> Self {
        let rel = if dir.is_empty() {
            "BUILD.bazel".to_string()
        } else {
            format!("{}/BUILD.bazel", dir)
        };
        self.file(&rel, content)
    }

    /// Write `<dir>/package.json` declaring `deps` as dependencies.
    pub fn package_json(self, dir: &str, deps: &[&str]) -> Self {
        let deps: serde_json::Map<String, serde_json::Value> = deps
            .iter()
            .map(|d| (d.to_string(), serde_json::Value::from("*")))
            .collect();
        let manifest = serde_json::json!({ "name": "fixture", "dependencies": deps });
        let rel = if dir.is_empty() {
            "package.json".to_string()
        } else {
            format!("{}/package.json", dir)
        };
        self.file(&rel, &manifest.to_string())
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::with_config(self.tmp.path(), self.config.clone())
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.tmp.path().join(rel)
    }
}

impl Default for WorkspaceFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// An [`ImportParser`] answering from canned records.
///
/// Records are keyed by workspace-relative file path. Files without a
/// record parse to nothing. Every request is remembered.
#[derive(Debug, Default)]
pub struct MockParser {
    records: HashMap<String, FileRecord>,
    requests: Mutex<Vec<ParseRequest>>,
}

impl MockParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module reference to the file at workspace path `file`.
    pub fn module(mut self, file: &str, name: &str, line: u32) -> Self {
        self.records
            .entry(file.to_string())
            .or_default()
            .modules
            .push(ModuleRef {
                name: name.to_string(),
                line,
                filepath: None,
            });
        self
    }

    /// Add a raw comment to the file at workspace path `file`.
    pub fn comment(mut self, file: &str, comment: &str) -> Self {
        self.records
            .entry(file.to_string())
            .or_default()
            .comments
            .push(comment.to_string());
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ParseRequest> {
        self.requests.lock().expect("poisoned").clone()
    }
}

impl ImportParser for MockParser {
    fn parse(&self, request: &ParseRequest) -> Result<Vec<FileRecord>, ParserError> {
        self.requests
            .lock()
            .map_err(|_| ParserError::Poisoned)?
            .push(request.clone());

        Ok(request
            .filenames
            .iter()
            .map(|f| {
                self.records
                    .get(&request.workspace_path(f))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }
}

/// An [`ImportParser`] whose stream is always broken.
#[derive(Debug, Default)]
pub struct FailingParser;

impl ImportParser for FailingParser {
    fn parse(&self, _request: &ParseRequest) -> Result<Vec<FileRecord>, ParserError> {
        Err(ParserError::Closed)
    }
}
