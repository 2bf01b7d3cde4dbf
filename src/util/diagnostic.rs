//! Diagnostics shown to the user.
//!
//! Every fatal problem found during a run is rendered as a [`Diagnostic`]:
//! the root cause, where it happened, and suggested fixes. Problems are
//! collected into [`Diagnostics`] rather than aborting on the first one, so a
//! single invocation reports everything that needs fixing.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }

    /// ANSI color code for the severity label.
    fn color_code(self) -> &'static str {
        match self {
            Severity::Error => "1;31",
            Severity::Warning => "1;33",
            Severity::Note => "1;36",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// One reportable problem: what went wrong, where, and how to fix it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Lines printed under the message
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    /// Fixes, printed as a numbered list
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// File the problem was found in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_context(mut self, line: impl Into<String>) -> Self {
        self.context.push(line.into());
        self
    }

    pub fn with_suggestion(mut self, fix: impl Into<String>) -> Self {
        self.suggestions.push(fix.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Render for a terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let mut out = format!(
            "{}: {}\n",
            paint(self.severity.as_str(), self.severity.color_code(), color),
            self.message
        );

        if let Some(path) = &self.location {
            out += &format!("  --> {}\n", path.display());
        }
        for line in &self.context {
            out += &format!("  → {}\n", line);
        }

        if !self.suggestions.is_empty() {
            out += &format!("\n{}: consider:\n", paint("help", "1;32", color));
            for (n, fix) in self.suggestions.iter().enumerate() {
                out += &format!("  {}. {}\n", n + 1, fix);
            }
        }

        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Run-wide accumulator of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether any collected diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Print every diagnostic to stderr.
    pub fn emit_all(&self, color: bool) {
        for diagnostic in &self.items {
            emit(diagnostic, color);
        }
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("multiple targets may be imported with \"shared/util\"")
            .with_location("app/main.ts")
            .with_context("candidate: //shared:a")
            .with_context("candidate: //shared:b")
            .with_suggestion("Pick one with `# gazelle:resolve ts shared/util <label>`");

        let output = diag.format(false);
        assert!(output.starts_with("error: multiple targets"));
        assert!(output.contains("  --> app/main.ts"));
        assert!(output.contains("candidate: //shared:b"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Pick one"));
    }

    #[test]
    fn test_diagnostics_accumulate() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());

        diags.push(Diagnostic::warning("unknown directive"));
        assert!(!diags.has_errors());

        diags.extend([Diagnostic::error("a"), Diagnostic::error("b")]);
        assert_eq!(diags.len(), 3);
        assert_eq!(diags.error_count(), 2);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_diagnostics_serialize() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error("boom").with_suggestion("fix it"));

        let json = serde_json::to_value(&diags).unwrap();
        assert_eq!(json[0]["severity"], "error");
        assert_eq!(json[0]["suggestions"][0], "fix it");
        assert!(json[0].get("location").is_none());
    }
}
