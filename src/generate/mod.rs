//! Per-directory target generation.
//!
//! Called once per directory in post-order. Decides whether the directory
//! produces units, collects their sources, splits tests from library code
//! and checks the result against rules already declared by hand.

pub mod collect;

pub use collect::{CollectError, SourceCollector};

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::core::config::{ConfigTree, NodeId};
use crate::core::directive::BuildFile;
use crate::core::unit::{check_collisions, CollisionError, GenerationUnit, UnitBuilder, UnitKind};
use crate::resolver::normalize::{basename, is_test_file};
use crate::util::diagnostic::Diagnostic;

/// One directory to generate.
#[derive(Debug, Clone, Copy)]
pub struct GenerateArgs<'a> {
    /// Absolute directory path
    pub dir: &'a Path,
    /// Workspace-relative directory (`""` for the root)
    pub rel: &'a str,
    /// Configuration of the directory
    pub node: NodeId,
    /// The directory's build file, if it is a package
    pub build_file: Option<&'a BuildFile>,
}

/// Units produced for one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateResult {
    /// Units with sources
    pub gen: Vec<GenerationUnit>,
    /// Previously declared units that no longer have sources
    pub empty: Vec<GenerationUnit>,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{} conflicting target name(s) in `{}`", .0.len(), .1)]
    Collision(Vec<CollisionError>, String),

    #[error("failed to collect sources for `{rel}`")]
    Collect {
        rel: String,
        dir: PathBuf,
        #[source]
        source: CollectError,
    },
}

impl GenerateError {
    /// Render as diagnostics, one per problem.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            GenerateError::Collision(errors, _) => {
                errors.iter().map(CollisionError::to_diagnostic).collect()
            }
            GenerateError::Collect { dir, source, .. } => {
                let mut diag = Diagnostic::error(self.to_string()).with_location(dir);
                let mut cause: Option<&dyn std::error::Error> = Some(source);
                while let Some(err) = cause {
                    diag = diag.with_context(err.to_string());
                    cause = err.source();
                }
                vec![diag]
            }
        }
    }
}

/// Produces generation units for directories.
pub struct Generator<'a> {
    tree: &'a ConfigTree,
    collector: &'a SourceCollector,
    repo: &'a str,
}

impl<'a> Generator<'a> {
    pub fn new(tree: &'a ConfigTree, collector: &'a SourceCollector, repo: &'a str) -> Self {
        Generator {
            tree,
            collector,
            repo,
        }
    }

    pub fn generate(&self, args: &GenerateArgs<'_>) -> Result<GenerateResult, GenerateError> {
        let config = self.tree.node(args.node);

        if !config.generation_enabled() {
            return Ok(GenerateResult::default());
        }

        if args.build_file.is_none() {
            // Only the top of a coarse-grained subtree generates without
            // being a package.
            if !config.is_coarse_grained() {
                return Ok(GenerateResult::default());
            }
            if self
                .tree
                .parent_of(args.node)
                .is_some_and(|parent| parent.is_coarse_grained())
            {
                return Ok(GenerateResult::default());
            }
        }

        let files = self
            .collector
            .collect(args.dir, self.tree, args.node)
            .map_err(|source| GenerateError::Collect {
                rel: args.rel.to_string(),
                dir: args.dir.to_path_buf(),
                source,
            })?;

        let (tests, library): (Vec<String>, Vec<String>) =
            files.into_iter().partition(|f| is_test_file(f));

        let package_name = package_name(args.dir, args.rel);
        let visibility = format!("//{}:__subpackages__", config.project_root());

        let mut result = GenerateResult::default();
        let mut collisions = Vec::new();

        for (kind, srcs) in [(UnitKind::Library, library), (UnitKind::Test, tests)] {
            let name = match kind {
                UnitKind::Library => config.render_library_name(&package_name),
                UnitKind::Test => config.render_test_name(&package_name),
            };
            let unit = UnitBuilder::new(kind, name, config.project_root(), args.rel)
                .visibility(&visibility)
                .srcs(srcs)
                .build();

            if unit.is_empty() {
                if self.is_declared(args.build_file, &unit) {
                    tracing::debug!("{} has no sources left", unit.label(self.repo));
                    result.empty.push(unit);
                }
                continue;
            }

            if let Some(file) = args.build_file {
                if let Err(e) = check_collisions(&unit, self.repo, file.rules()) {
                    collisions.push(e);
                    continue;
                }
            }
            result.gen.push(unit);
        }

        if !collisions.is_empty() {
            return Err(GenerateError::Collision(collisions, args.rel.to_string()));
        }

        Ok(result)
    }

    fn is_declared(&self, build_file: Option<&BuildFile>, unit: &GenerationUnit) -> bool {
        build_file.is_some_and(|file| {
            file.rules()
                .iter()
                .any(|rule| rule.name == unit.name && rule.kind == unit.rule_kind())
        })
    }
}

/// Base name of the directory, used in naming templates.
fn package_name(dir: &Path, rel: &str) -> String {
    if rel.is_empty() {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        basename(rel).to_string()
    }
}
