//! `quay normalize` command

use anyhow::Result;

use crate::cli::NormalizeArgs;
use quay::resolver::normalize::to_workspace_import_path;

pub fn execute(args: NormalizeArgs) -> Result<()> {
    println!(
        "{}",
        to_workspace_import_path(&args.package, &args.source, &args.import)
    );
    Ok(())
}
