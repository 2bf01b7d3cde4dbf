//! Import extraction.
//!
//! Source files are handed to an [`ImportParser`] in batches, one batch per
//! generation unit. Two implementations exist: [`ParserSession`] speaks a
//! JSON request/response protocol with an external helper process, and
//! [`BuiltinScanner`] is an in-process regex scanner used when no helper is
//! configured.
//!
//! Wire format: a request is one JSON object per line
//! (`{"repo_root": ..., "rel_package_path": ..., "filenames": [...]}`);
//! the reply is a JSON array with one record per file, terminated by a
//! single NUL byte.

pub mod annotations;
pub mod scan;
pub mod session;

pub use annotations::Annotations;
pub use scan::BuiltinScanner;
pub use session::ParserSession;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::import::ImportStatement;
use crate::resolver::normalize::join;

/// Errors talking to a parser.
///
/// Any of these leaves the parser unusable, so they are fatal to the run.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("parser stream failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode parser request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("parser returned malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("parser process exited before replying")]
    Exited,

    #[error("parser session is closed")]
    Closed,

    #[error("parser session lock poisoned")]
    Poisoned,

    #[error("parser returned {found} records for {expected} files")]
    RecordCount { expected: usize, found: usize },
}

/// A batch of files from one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseRequest {
    pub repo_root: String,
    pub rel_package_path: String,
    /// Files relative to `rel_package_path`
    pub filenames: Vec<String>,
}

/// Parse results for one file, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileRecord {
    #[serde(default)]
    pub modules: Vec<ModuleRef>,

    /// Raw comment text, scanned for ignore annotations
    #[serde(default)]
    pub comments: Vec<String>,
}

/// A module referenced by an import.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleRef {
    pub name: String,

    #[serde(rename = "lineno")]
    pub line: u32,

    /// Workspace-relative path of the importing file, when the parser
    /// reports it
    #[serde(default)]
    pub filepath: Option<String>,
}

/// Something that extracts module references from source files.
pub trait ImportParser {
    fn parse(&self, request: &ParseRequest) -> Result<Vec<FileRecord>, ParserError>;
}

/// Turn parser records into import statements.
///
/// Modules named by an ignore annotation in the same file, or for which
/// `ignores` returns true, are dropped.
pub fn collect_imports(
    request: &ParseRequest,
    records: &[FileRecord],
    annotation_prefix: &str,
    ignores: impl Fn(&str) -> bool,
) -> BTreeSet<ImportStatement> {
    let mut imports = BTreeSet::new();

    for (filename, record) in request.filenames.iter().zip(records) {
        let annotations = Annotations::from_comments(&record.comments, annotation_prefix);

        for module in &record.modules {
            if annotations.ignores(&module.name) || ignores(&module.name) {
                continue;
            }
            let source = module
                .filepath
                .as_deref()
                .map(|path| package_relative(&request.rel_package_path, path))
                .unwrap_or(filename.as_str());
            imports.insert(ImportStatement::new(&module.name, source, module.line));
        }
    }

    imports
}

fn package_relative<'a>(pkg: &str, path: &'a str) -> &'a str {
    if pkg.is_empty() {
        return path;
    }
    path.strip_prefix(pkg)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

impl ParseRequest {
    pub fn new(
        repo_root: impl Into<String>,
        rel_package_path: impl Into<String>,
        filenames: impl IntoIterator<Item = String>,
    ) -> Self {
        ParseRequest {
            repo_root: repo_root.into(),
            rel_package_path: rel_package_path.into(),
            filenames: filenames.into_iter().collect(),
        }
    }

    /// Workspace-relative path of a requested file.
    pub fn workspace_path(&self, filename: &str) -> String {
        join(&[&self.rel_package_path, filename])
    }
}
