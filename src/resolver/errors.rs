//! Resolution error types and diagnostics.

use thiserror::Error;

use crate::core::label::Label;
use crate::util::diagnostic::Diagnostic;

/// A fatal problem found while resolving one import.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(
        "multiple targets ({}) may be imported with \"{import}\" at line {line} in \"{source_path}\"",
        candidates.join(", ")
    )]
    Ambiguous {
        from: Label,
        import: String,
        source_path: String,
        line: u32,
        candidates: Vec<String>,
    },

    #[error("\"{import}\" at line {line} from \"{source_path}\" is an invalid dependency")]
    InvalidDependency {
        from: Label,
        import: String,
        source_path: String,
        line: u32,
    },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::Ambiguous {
                from,
                import,
                source_path,
                line,
                candidates,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "multiple targets may be imported with \"{}\" in target `{}`",
                    import, from
                ))
                .with_location(source_path)
                .with_context(format!("imported at line {}", line));

                for candidate in candidates {
                    diag = diag.with_context(format!("candidate: {}", candidate));
                }

                diag.with_suggestion(format!(
                    "Pick one with `# gazelle:resolve ts {} <label>` in a build file",
                    import
                ))
            }

            ResolveError::InvalidDependency {
                from,
                import,
                source_path,
                line,
            } => Diagnostic::error(format!(
                "failed to validate dependencies for target `{}`: \"{}\" is an invalid dependency",
                from, import
            ))
            .with_location(source_path)
            .with_context(format!("imported at line {}", line))
            .with_suggestion("Add it as a dependency in the package.json file")
            .with_suggestion(format!(
                "Resolve it to a known target with `# gazelle:resolve ts {} <label>`",
                import
            ))
            .with_suggestion(format!(
                "Ignore it with a `// gazelle:ignore {}` comment in the source file",
                import
            )),
        }
    }
}
