//! Generation units: targets being assembled for one directory.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::core::directive::{ManualRule, LIBRARY_NAMING_DIRECTIVE, TEST_NAMING_DIRECTIVE};
use crate::core::label::Label;
use crate::resolver::normalize::{clean, index_directory, join, strip_import_extensions};
use crate::util::diagnostic::Diagnostic;

/// Rule kind of every generated target.
pub const TS_PROJECT_KIND: &str = "ts_project";

/// Which of the two per-directory targets a unit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Library,
    Test,
}

impl UnitKind {
    /// Rule kind declared in the build file.
    pub fn rule_kind(&self) -> &'static str {
        TS_PROJECT_KIND
    }

    /// Directive that controls this kind's naming template.
    pub fn naming_directive(&self) -> &'static str {
        match self {
            UnitKind::Library => LIBRARY_NAMING_DIRECTIVE,
            UnitKind::Test => TEST_NAMING_DIRECTIVE,
        }
    }
}

/// A target in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationUnit {
    pub kind: UnitKind,
    pub name: String,

    /// Project root the unit belongs to
    pub root: String,

    /// Package (directory) the unit is declared in
    pub package: String,

    /// Source files relative to `package`
    pub srcs: BTreeSet<String>,

    /// Resolved dependency strings, relative to this unit
    pub deps: BTreeSet<String>,

    pub visibility: Vec<String>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub testonly: bool,
}

impl GenerationUnit {
    /// Rule kind declared in the build file.
    pub fn rule_kind(&self) -> &'static str {
        self.kind.rule_kind()
    }

    /// The unit's identity.
    pub fn label(&self, repo: &str) -> Label {
        Label::new(repo, self.package.clone(), self.name.clone())
    }

    /// Logical import paths this unit can be imported as.
    ///
    /// Every source provides its extension-stripped workspace path; index
    /// files also provide their directory.
    pub fn provides(&self) -> BTreeSet<String> {
        let mut provides = BTreeSet::new();
        for src in &self.srcs {
            let spec = strip_import_extensions(&clean(&join(&[&self.package, src]))).to_string();
            if let Some(dir) = index_directory(&spec) {
                provides.insert(dir.to_string());
            }
            provides.insert(spec);
        }
        provides
    }

    pub fn is_empty(&self) -> bool {
        self.srcs.is_empty()
    }
}

/// Builder for [`GenerationUnit`].
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    unit: GenerationUnit,
}

impl UnitBuilder {
    pub fn new(
        kind: UnitKind,
        name: impl Into<String>,
        root: impl Into<String>,
        package: impl Into<String>,
    ) -> Self {
        UnitBuilder {
            unit: GenerationUnit {
                kind,
                name: name.into(),
                root: root.into(),
                package: package.into(),
                srcs: BTreeSet::new(),
                deps: BTreeSet::new(),
                visibility: Vec::new(),
                testonly: kind == UnitKind::Test,
            },
        }
    }

    pub fn visibility(mut self, visibility: impl Into<String>) -> Self {
        self.unit.visibility.push(visibility.into());
        self
    }

    pub fn srcs<I, S>(mut self, srcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unit.srcs.extend(srcs.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> GenerationUnit {
        self.unit
    }
}

/// A generated target would replace a manual rule of another kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "failed to generate target \"{label}\" of kind \"{kind}\": a target of kind \"{existing_kind}\" with the same name already exists"
)]
pub struct CollisionError {
    pub label: Label,
    pub kind: String,
    pub existing_kind: String,
    pub naming_directive: String,
}

impl CollisionError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string()).with_suggestion(format!(
            "Use the `# gazelle:{}` directive to change the naming convention",
            self.naming_directive
        ))
    }
}

/// Check a unit about to be generated against the rules already declared
/// by hand in the same directory.
///
/// A rule of the same name and kind is updated in place; a different kind
/// is a conflict.
pub fn check_collisions(
    unit: &GenerationUnit,
    repo: &str,
    existing: &[ManualRule],
) -> Result<(), CollisionError> {
    match existing
        .iter()
        .find(|rule| rule.name == unit.name && rule.kind != unit.rule_kind())
    {
        Some(rule) => Err(CollisionError {
            label: unit.label(repo),
            kind: unit.rule_kind().to_string(),
            existing_kind: rule.kind.clone(),
            naming_directive: unit.kind.naming_directive().to_string(),
        }),
        None => Ok(()),
    }
}
