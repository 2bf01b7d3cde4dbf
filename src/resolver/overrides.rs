//! Explicit import-to-target overrides.
//!
//! Entries come from `resolve` directives and apply to the declaring
//! directory and everything below it. When several directories declare an
//! override for the same import, the deepest one wins; within one directory
//! the last declaration wins.

use std::collections::HashMap;

use crate::core::label::Label;
use crate::resolver::LANGUAGE_NAMES;

#[derive(Debug, Clone)]
struct OverrideEntry {
    dir: String,
    label: Label,
}

/// User-curated mapping from logical import path to target.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: HashMap<String, Vec<OverrideEntry>>,
}

impl OverrideTable {
    pub fn new() -> Self {
        OverrideTable::default()
    }

    /// Add an override declared in directory `dir`.
    pub fn add(&mut self, dir: &str, import: impl Into<String>, label: Label) {
        self.entries
            .entry(import.into())
            .or_default()
            .push(OverrideEntry {
                dir: dir.to_string(),
                label,
            });
    }

    /// Parse and add the value of a `resolve` directive.
    ///
    /// Accepted forms are `<lang> <import> <label>` and
    /// `<source-lang> <lang> <import> <label>`. Entries for other languages
    /// are skipped.
    pub fn add_directive(&mut self, dir: &str, value: &str) -> Result<(), String> {
        let fields: Vec<&str> = value.split_whitespace().collect();
        let (lang, import, label) = match fields.as_slice() {
            [lang, import, label] => (*lang, *import, *label),
            [_, lang, import, label] => (*lang, *import, *label),
            _ => {
                return Err(
                    "expected `<lang> <import> <label>` or `<source-lang> <lang> <import> <label>`"
                        .to_string(),
                )
            }
        };

        if !LANGUAGE_NAMES.contains(&lang) {
            return Ok(());
        }

        let label: Label = label.parse().map_err(|e| format!("{}", e))?;
        self.add(dir, import, label);
        Ok(())
    }

    /// Find the override visible from package `from_pkg` for `import`.
    pub fn find(&self, from_pkg: &str, import: &str) -> Option<&Label> {
        let mut best: Option<&OverrideEntry> = None;
        for entry in self.entries.get(import)? {
            if !is_ancestor_or_self(&entry.dir, from_pkg) {
                continue;
            }
            // `>=` so that a later declaration in the same directory wins.
            if best.map_or(true, |b| entry.dir.len() >= b.dir.len()) {
                best = Some(entry);
            }
        }
        best.map(|e| &e.label)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_ancestor_or_self(dir: &str, pkg: &str) -> bool {
    dir.is_empty()
        || dir == pkg
        || (pkg.starts_with(dir) && pkg.as_bytes().get(dir.len()) == Some(&b'/'))
}
