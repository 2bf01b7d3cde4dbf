//! Import statements discovered in source files.

use std::cmp::Ordering;

use serde::Serialize;

/// One import as written in a source file.
///
/// Statements are ordered and deduplicated by `(path, source_path)` only, so
/// repeated imports of the same module from one file collapse into the first
/// occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct ImportStatement {
    /// Raw import path as written (`./foo`, `react`, `@scope/pkg/sub`)
    pub path: String,

    /// Path of the importing file, relative to the unit's package
    pub source_path: String,

    /// 1-based line number of the import
    pub line: u32,
}

impl ImportStatement {
    /// Create a new import statement.
    pub fn new(path: impl Into<String>, source_path: impl Into<String>, line: u32) -> Self {
        ImportStatement {
            path: path.into(),
            source_path: source_path.into(),
            line,
        }
    }
}

/// Whether a raw import path starts with a relative-path marker.
pub fn is_relative_import(path: &str) -> bool {
    path == "." || path == ".." || path.starts_with("./") || path.starts_with("../")
}

impl PartialEq for ImportStatement {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ImportStatement {}

impl PartialOrd for ImportStatement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ImportStatement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path
            .cmp(&other.path)
            .then_with(|| self.source_path.cmp(&other.source_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_import_ordering_ignores_line() {
        let mut set = BTreeSet::new();
        set.insert(ImportStatement::new("./b", "main.ts", 3));
        set.insert(ImportStatement::new("./a", "main.ts", 7));
        set.insert(ImportStatement::new("./a", "main.ts", 9));
        set.insert(ImportStatement::new("./a", "other.ts", 1));

        let ordered: Vec<_> = set
            .iter()
            .map(|s| (s.path.as_str(), s.source_path.as_str(), s.line))
            .collect();
        assert_eq!(
            ordered,
            vec![
                ("./a", "main.ts", 7),
                ("./a", "other.ts", 1),
                ("./b", "main.ts", 3),
            ]
        );
    }

    #[test]
    fn test_relative_marker() {
        assert!(is_relative_import("./foo"));
        assert!(is_relative_import("../foo"));
        assert!(is_relative_import(".."));
        assert!(!is_relative_import(".hidden/foo"));
        assert!(!is_relative_import("react"));
    }
}
