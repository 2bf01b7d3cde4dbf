//! Implementation of `quay generate`.
//!
//! A run has three passes over the workspace:
//! 1. configure every directory top-down from its build file,
//! 2. generate units children-first and index what they provide,
//! 3. parse the imports of each unit and resolve them to dependencies.
//!
//! Fatal problems are accumulated into the report's diagnostics so one run
//! shows everything that needs fixing. Directive errors and parser stream
//! failures abort immediately.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use walkdir::WalkDir;

use crate::core::config::{ConfigTree, NodeId};
use crate::core::directive::BuildFile;
use crate::core::import::ImportStatement;
use crate::core::unit::GenerationUnit;
use crate::core::Workspace;
use crate::generate::{GenerateArgs, Generator, SourceCollector};
use crate::parser::{collect_imports, BuiltinScanner, ImportParser, ParseRequest, ParserSession};
use crate::resolver::{NpmRegistry, Resolver, RuleIndex, LANGUAGE_NAME};
use crate::util::diagnostic::Diagnostics;
use crate::util::fs::is_hidden;
use crate::util::process::{resolve_program, ProcessBuilder};

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Only report units at or below this directory (defaults to the
    /// whole workspace)
    pub path: Option<PathBuf>,

    /// Dependency string to explain
    pub explain: Option<String>,

    /// Show a spinner while walking
    pub progress: bool,
}

/// Result of a generate run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Generated units with their resolved dependencies
    pub units: Vec<GenerationUnit>,
    /// Declared units that no longer have sources
    pub empty: Vec<GenerationUnit>,
    pub diagnostics: Diagnostics,
}

impl GenerationReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// A configured directory.
struct Visit {
    dir: PathBuf,
    rel: String,
    node: NodeId,
    build_file: Option<BuildFile>,
}

/// A generated unit awaiting resolution.
struct Pending {
    unit: GenerationUnit,
    node: NodeId,
}

/// Generate units for the workspace and resolve their dependencies.
///
/// Imports are read by the configured external parser, or by the built-in
/// scanner when none is configured.
pub fn generate(ws: &Workspace, opts: &GenerateOptions) -> Result<GenerationReport> {
    match start_parser(ws)? {
        Some(mut session) => {
            let report = generate_with(ws, opts, &session);
            session.shutdown()?;
            report
        }
        None => generate_with(ws, opts, &BuiltinScanner::new()),
    }
}

/// Like [`generate`], reading imports with `parser`.
pub fn generate_with(
    ws: &Workspace,
    opts: &GenerateOptions,
    parser: &dyn ImportParser,
) -> Result<GenerationReport> {
    let scope = match &opts.path {
        Some(path) => ws
            .rel_path(path)
            .with_context(|| format!("cannot generate `{}`", path.display()))?,
        None => String::new(),
    };

    let spinner = spinner(opts.progress);
    let mut tree = ConfigTree::new();

    spinner.set_message("configuring");
    let visits = configure(ws, &mut tree)?;
    tracing::debug!("configured {} directories", visits.len());

    spinner.set_message("generating");
    let mut report = GenerationReport::default();
    let mut pending = generate_units(ws, &tree, &visits, &mut report);
    if report.has_errors() {
        spinner.finish_and_clear();
        return Ok(report);
    }

    let repo = ws.repo_name();
    let mut index = RuleIndex::new();
    for p in &pending {
        index.add_unit(LANGUAGE_NAME, repo, &p.unit);
    }

    let project_roots: BTreeSet<&str> = pending.iter().map(|p| p.unit.root.as_str()).collect();
    let registry = NpmRegistry::load(ws.root(), repo, project_roots.iter().copied())
        .context("failed to load third-party packages")?;

    pending.sort_by(|a, b| (&a.unit.package, &a.unit.name).cmp(&(&b.unit.package, &b.unit.name)));

    let resolver =
        Resolver::new(&tree, &index, &registry, repo).with_explain(opts.explain.as_deref());

    spinner.set_message("resolving");
    let mut units = Vec::new();
    for Pending { mut unit, node } in pending {
        if !in_scope(&scope, &unit.package) {
            continue;
        }
        spinner.tick();

        let imports = parse_imports(ws, &tree, parser, &unit, node)?;
        let resolution = resolver.resolve(&unit, node, &imports);
        report
            .diagnostics
            .extend(resolution.errors.iter().map(|e| e.to_diagnostic()));
        unit.deps = resolution.deps;
        units.push(unit);
    }
    spinner.finish_and_clear();

    report.units = units;
    report.empty.retain(|unit| in_scope(&scope, &unit.package));
    report
        .empty
        .sort_by(|a, b| (&a.package, &a.name).cmp(&(&b.package, &b.name)));

    tracing::debug!(
        "generated {} unit(s), {} empty",
        report.units.len(),
        report.empty.len()
    );
    Ok(report)
}

/// Walk the workspace top-down, configuring each directory from its build
/// file before any of its children.
fn configure(ws: &Workspace, tree: &mut ConfigTree) -> Result<Vec<Visit>> {
    let names = ws.build_file_names();
    let skip_dirs = ws.skip_dirs();

    let walker = WalkDir::new(ws.root())
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            entry.file_type().is_dir()
                && !is_hidden(&name)
                && !skip_dirs.iter().any(|skip| *skip == *name)
        });

    let mut visits = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk `{}`", ws.root().display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.into_path();
        let rel = ws.rel_path(&dir)?;
        let build_file = BuildFile::load(&dir, &names, ws.directive_prefix())?;
        let node = tree.configure(&rel, build_file.as_ref())?;

        visits.push(Visit {
            dir,
            rel,
            node,
            build_file,
        });
    }

    Ok(visits)
}

/// Generate every directory children-first. Collisions and collection
/// failures are recorded and generation continues with the next directory.
fn generate_units(
    ws: &Workspace,
    tree: &ConfigTree,
    visits: &[Visit],
    report: &mut GenerationReport,
) -> Vec<Pending> {
    let collector = SourceCollector::new(ws.build_file_names(), ws.skip_dirs());
    let generator = Generator::new(tree, &collector, ws.repo_name());

    let mut pending = Vec::new();
    for visit in visits.iter().rev() {
        let args = GenerateArgs {
            dir: &visit.dir,
            rel: &visit.rel,
            node: visit.node,
            build_file: visit.build_file.as_ref(),
        };
        match generator.generate(&args) {
            Ok(result) => {
                pending.extend(result.gen.into_iter().map(|unit| Pending {
                    unit,
                    node: visit.node,
                }));
                report.empty.extend(result.empty);
            }
            Err(e) => {
                tracing::debug!("{}", e);
                report.diagnostics.extend(e.to_diagnostics());
            }
        }
    }
    pending
}

/// Start the configured external parser, if any.
fn start_parser(ws: &Workspace) -> Result<Option<ParserSession>> {
    let config = &ws.config().parser;
    let Some(command) = config.command.as_deref() else {
        return Ok(None);
    };

    let Some(program) = resolve_program(command, ws.root()) else {
        bail!(
            "parser `{}` not found\n\
             hint: set `parser.command` in .quay/config.toml to an executable on PATH",
            command
        );
    };

    let process = ProcessBuilder::new(program)
        .args(&config.args)
        .cwd(ws.root());
    let session = ParserSession::start(&process, config.lifetime())
        .with_context(|| format!("failed to start parser `{}`", command))?;
    Ok(Some(session))
}

fn parse_imports(
    ws: &Workspace,
    tree: &ConfigTree,
    parser: &dyn ImportParser,
    unit: &GenerationUnit,
    node: NodeId,
) -> Result<BTreeSet<ImportStatement>> {
    let request = ParseRequest::new(
        ws.root().to_string_lossy(),
        unit.package.as_str(),
        unit.srcs.iter().cloned(),
    );
    let records = parser
        .parse(&request)
        .with_context(|| format!("failed to parse the sources of `{}`", unit.label(ws.repo_name())))?;

    Ok(collect_imports(
        &request,
        &records,
        ws.directive_prefix(),
        |module| tree.ignores_dependency(node, module),
    ))
}

fn in_scope(scope: &str, package: &str) -> bool {
    scope.is_empty()
        || package == scope
        || package
            .strip_prefix(scope)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn spinner(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
