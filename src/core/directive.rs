//! Build descriptor files: directives and manual rule declarations.
//!
//! A build descriptor (`BUILD.bazel` or `BUILD`) marks a package boundary.
//! Quay reads two things out of it:
//! - Directive comments of the form `# gazelle:<key> <value>`
//! - The kind and name of every rule call already declared by hand
//!
//! The rest of the file belongs to the host build tool and is left alone.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use regex::Regex;
use thiserror::Error;

/// Default directive comment prefix.
pub const DEFAULT_DIRECTIVE_PREFIX: &str = "gazelle:";

/// Default build descriptor names, in lookup order.
pub const DEFAULT_BUILD_FILE_NAMES: &[&str] = &["BUILD.bazel", "BUILD"];

// Directive keys
pub const GENERATION_DIRECTIVE: &str = "ts_generation";
pub const ROOT_DIRECTIVE: &str = "ts_root";
pub const IGNORE_DEPENDENCIES_DIRECTIVE: &str = "ts_ignore_dependencies";
pub const IGNORE_FILES_DIRECTIVE: &str = "ts_ignore_files";
pub const VALIDATE_IMPORTS_DIRECTIVE: &str = "ts_validate_import_statements";
pub const GENERATION_MODE_DIRECTIVE: &str = "ts_generation_mode";
pub const LIBRARY_NAMING_DIRECTIVE: &str = "ts_project_naming_convention";
pub const TEST_NAMING_DIRECTIVE: &str = "ts_test_naming_convention";
pub const ENVIRONMENT_DIRECTIVE: &str = "ts_environment";
pub const EXCLUDE_DIRECTIVE: &str = "exclude";
pub const RESOLVE_DIRECTIVE: &str = "resolve";

static RULE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

static NAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bname\s*=\s*"([^"]*)""#).unwrap());

/// A single `key value` directive read from a build descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub key: String,
    pub value: String,
    /// 1-based line number
    pub line: usize,
    /// Byte offset of the value within the file
    pub offset: usize,
}

/// A rule declared by hand in a build descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualRule {
    pub kind: String,
    pub name: String,
}

/// Invalid directive value. Fatal for the whole run.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("invalid value for directive `{key}`: `{value}`")]
#[diagnostic(code(quay::config::invalid_directive))]
pub struct DirectiveError {
    pub key: String,
    pub value: String,
    #[help]
    pub help: Option<String>,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("invalid value")]
    pub span: SourceSpan,
}

/// A parsed build descriptor.
#[derive(Debug, Clone)]
pub struct BuildFile {
    path: PathBuf,
    content: String,
    directives: Vec<Directive>,
    rules: Vec<ManualRule>,
}

impl BuildFile {
    /// Parse build descriptor text.
    pub fn parse(path: impl Into<PathBuf>, content: impl Into<String>, prefix: &str) -> Self {
        let content = content.into();
        let directives = parse_directives(&content, prefix);
        let rules = parse_rules(&content);
        BuildFile {
            path: path.into(),
            content,
            directives,
            rules,
        }
    }

    /// Load the build descriptor of `dir`, if the directory has one.
    pub fn load(dir: &Path, names: &[String], prefix: &str) -> Result<Option<Self>> {
        let Some(path) = find_build_file(dir, names) else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read build file: {}", path.display()))?;
        Ok(Some(Self::parse(path, content, prefix)))
    }

    /// Path of the descriptor on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn rules(&self) -> &[ManualRule] {
        &self.rules
    }

    /// Build a fatal error pointing at a directive's value.
    pub fn directive_error(&self, directive: &Directive, help: impl Into<String>) -> DirectiveError {
        DirectiveError {
            key: directive.key.clone(),
            value: directive.value.clone(),
            help: Some(help.into()),
            src: NamedSource::new(self.path.display().to_string(), self.content.clone()),
            span: (directive.offset, directive.value.len()).into(),
        }
    }
}

/// Find the first existing build descriptor in `dir`.
pub fn find_build_file(dir: &Path, names: &[String]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Whether `dir` is a package boundary.
pub fn is_package_boundary(dir: &Path, names: &[String]) -> bool {
    find_build_file(dir, names).is_some()
}

fn parse_directives(content: &str, prefix: &str) -> Vec<Directive> {
    let mut directives = Vec::new();
    let mut offset = 0;

    for (idx, raw_line) in content.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += raw_line.len();

        let line = raw_line.trim_end_matches(['\n', '\r']);
        let Some(comment) = line.trim_start().strip_prefix('#') else {
            continue;
        };
        let Some(body) = comment.trim_start().strip_prefix(prefix) else {
            continue;
        };

        let body = body.trim_end();
        let (key, value) = match body.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (body, ""),
        };
        if key.is_empty() {
            continue;
        }

        // Locate the value inside the original line for diagnostics.
        let value_offset = if value.is_empty() {
            line_start + line.len()
        } else {
            line_start + line.rfind(value).unwrap_or(line.len())
        };

        directives.push(Directive {
            key: key.to_string(),
            value: value.to_string(),
            line: idx + 1,
            offset: value_offset,
        });
    }

    directives
}

fn parse_rules(content: &str) -> Vec<ManualRule> {
    let mut rules = Vec::new();

    for caps in RULE_CALL.captures_iter(content) {
        let kind = &caps[1];
        let open = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let Some(body) = call_body(&content[open..]) else {
            continue;
        };
        if let Some(name) = NAME_ATTR.captures(body) {
            rules.push(ManualRule {
                kind: kind.to_string(),
                name: name[1].to_string(),
            });
        }
    }

    rules
}

/// Return the text up to the parenthesis closing an already-open call.
fn call_body(text: &str) -> Option<&str> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..idx]);
                }
            }
            _ => {}
        }
    }

    None
}
