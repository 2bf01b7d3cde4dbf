//! `quay generate` command

use std::io::IsTerminal;

use anyhow::{bail, Result};

use crate::cli::{GenerateArgs, GlobalArgs};
use quay::core::workspace::find_workspace_root;
use quay::core::{GenerationUnit, Workspace};
use quay::ops::quay_generate::{generate, GenerateOptions, GenerationReport};
use quay::util::fs::normalize_path;
use quay::util::GlobalContext;

pub fn execute(args: GenerateArgs, global: &GlobalArgs) -> Result<()> {
    let mut ctx = GlobalContext::new()?;
    ctx.set_color(!global.no_color && std::io::stderr().is_terminal());

    let path = args
        .path
        .as_deref()
        .map(|p| normalize_path(&ctx.resolve_path(p)));
    let root = match &path {
        Some(path) => find_workspace_root(path)?,
        None => ctx.find_workspace_root()?,
    };
    let ws = Workspace::new(&root, &ctx);

    let opts = GenerateOptions {
        path,
        explain: global.explain_dependency.clone(),
        progress: !args.json && std::io::stderr().is_terminal(),
    };

    let report = generate(&ws, &opts)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    report.diagnostics.emit_all(ctx.color());

    if report.has_errors() {
        bail!(
            "generation failed with {} error(s)",
            report.diagnostics.error_count()
        );
    }

    Ok(())
}

fn print_report(report: &GenerationReport) {
    for unit in &report.units {
        print!("{}", render_unit(unit));
    }
    for unit in &report.empty {
        eprintln!(
            "     Removed {} `{}` in //{} (no sources)",
            unit.rule_kind(),
            unit.name,
            unit.package
        );
    }
    eprintln!("    Finished {} target(s)", report.units.len());
}

/// Render a unit the way it would appear in its build file.
fn render_unit(unit: &GenerationUnit) -> String {
    let mut out = format!("# //{}\n{}(\n", unit.package, unit.rule_kind());
    out.push_str(&format!("    name = \"{}\",\n", unit.name));
    push_list(&mut out, "srcs", unit.srcs.iter());
    push_list(&mut out, "deps", unit.deps.iter());
    push_list(&mut out, "visibility", unit.visibility.iter());
    if unit.testonly {
        out.push_str("    testonly = True,\n");
    }
    out.push_str(")\n\n");
    out
}

fn push_list<'a>(out: &mut String, attr: &str, items: impl ExactSizeIterator<Item = &'a String>) {
    if items.len() == 0 {
        return;
    }
    out.push_str(&format!("    {} = [\n", attr));
    for item in items {
        out.push_str(&format!("        \"{}\",\n", item));
    }
    out.push_str("    ],\n");
}
