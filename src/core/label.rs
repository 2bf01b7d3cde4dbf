//! Build target labels.
//!
//! A Label identifies a declared target by repository, package path and
//! target name. Dependency strings are labels rendered relative to the
//! importing unit, so a target in the same package renders as `:name`.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error parsing a label string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("empty label")]
    Empty,

    #[error("invalid label `{0}`: expected `//pkg:name`, `@repo//pkg:name` or `:name`")]
    Malformed(String),
}

/// A fully- or partially-qualified target identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Label {
    /// Repository name (empty for the main repository)
    pub repo: String,

    /// Slash-separated package path relative to the workspace root
    pub pkg: String,

    /// Target name
    pub name: String,

    /// Rendered without repository and package (`:name`)
    pub relative: bool,
}

impl Label {
    /// Create an absolute label.
    pub fn new(repo: impl Into<String>, pkg: impl Into<String>, name: impl Into<String>) -> Self {
        Label {
            repo: repo.into(),
            pkg: pkg.into(),
            name: name.into(),
            relative: false,
        }
    }

    /// Render this label relative to the given repository and package.
    ///
    /// The repository is dropped when it matches, and the whole prefix is
    /// dropped when both repository and package match.
    pub fn rel(&self, from_repo: &str, from_pkg: &str) -> Label {
        if self.relative {
            return self.clone();
        }
        if self.repo == from_repo && self.pkg == from_pkg {
            return Label {
                repo: String::new(),
                pkg: String::new(),
                name: self.name.clone(),
                relative: true,
            };
        }
        let mut rel = self.clone();
        if rel.repo == from_repo {
            rel.repo.clear();
        }
        rel
    }

    /// Check whether this label points at the same target as `other`,
    /// treating an empty repository as the main repository.
    pub fn same_target(&self, other: &Label) -> bool {
        self.repo == other.repo && self.pkg == other.pkg && self.name == other.name
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relative {
            return write!(f, ":{}", self.name);
        }
        if !self.repo.is_empty() {
            write!(f, "@{}", self.repo)?;
        }
        write!(f, "//{}", self.pkg)?;

        let last_segment = self.pkg.rsplit('/').next().unwrap_or("");
        if self.pkg.is_empty() || last_segment != self.name {
            write!(f, ":{}", self.name)?;
        }
        Ok(())
    }
}

impl FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LabelError::Empty);
        }

        if let Some(name) = s.strip_prefix(':') {
            if name.is_empty() {
                return Err(LabelError::Malformed(s.to_string()));
            }
            return Ok(Label {
                repo: String::new(),
                pkg: String::new(),
                name: name.to_string(),
                relative: true,
            });
        }

        let (repo, rest) = match s.strip_prefix('@') {
            Some(stripped) => match stripped.split_once("//") {
                Some((repo, rest)) => (repo.to_string(), rest),
                None => return Err(LabelError::Malformed(s.to_string())),
            },
            None => match s.strip_prefix("//") {
                Some(rest) => (String::new(), rest),
                None => return Err(LabelError::Malformed(s.to_string())),
            },
        };

        let (pkg, name) = match rest.split_once(':') {
            Some((pkg, name)) => (pkg.to_string(), name.to_string()),
            None => {
                let name = rest.rsplit('/').next().unwrap_or(rest).to_string();
                (rest.to_string(), name)
            }
        };

        if name.is_empty() || pkg.starts_with('/') || pkg.ends_with('/') {
            return Err(LabelError::Malformed(s.to_string()));
        }

        Ok(Label::new(repo, pkg, name))
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
