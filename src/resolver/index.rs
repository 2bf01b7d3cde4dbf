//! Workspace-wide rule index.
//!
//! Maps `(language, logical import path)` to every declared target that
//! claims to provide that import. Candidates for one import are kept sorted
//! so lookups are deterministic.

use std::collections::{BTreeSet, HashMap};

use crate::core::label::Label;
use crate::core::unit::GenerationUnit;

#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    by_import: HashMap<(String, String), BTreeSet<Label>>,
}

impl RuleIndex {
    pub fn new() -> Self {
        RuleIndex::default()
    }

    /// Record that `label` provides `import` for `lang`.
    pub fn add(&mut self, lang: &str, import: impl Into<String>, label: Label) {
        self.by_import
            .entry((lang.to_string(), import.into()))
            .or_default()
            .insert(label);
    }

    /// Index every import a generated unit provides.
    pub fn add_unit(&mut self, lang: &str, repo: &str, unit: &GenerationUnit) {
        let label = unit.label(repo);
        for import in unit.provides() {
            self.add(lang, import, label.clone());
        }
    }

    /// All targets providing `import`, in label order.
    pub fn find(&self, lang: &str, import: &str) -> Vec<&Label> {
        self.by_import
            .get(&(lang.to_string(), import.to_string()))
            .map(|labels| labels.iter().collect())
            .unwrap_or_default()
    }

    /// Number of indexed imports.
    pub fn len(&self) -> usize {
        self.by_import.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_import.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::{UnitBuilder, UnitKind};

    #[test]
    fn test_index_unit_provides() {
        let unit = UnitBuilder::new(UnitKind::Library, "lib", "", "lib")
            .srcs(["index.ts", "util.ts", "nested/deep.tsx"])
            .build();

        let mut index = RuleIndex::new();
        index.add_unit("ts", "", &unit);

        let lib = Label::new("", "lib", "lib");
        assert_eq!(index.find("ts", "lib/util"), vec![&lib]);
        assert_eq!(index.find("ts", "lib/index"), vec![&lib]);
        assert_eq!(index.find("ts", "lib"), vec![&lib]);
        assert_eq!(index.find("ts", "lib/nested/deep"), vec![&lib]);
        assert!(index.find("ts", "lib/missing").is_empty());
        assert!(index.find("py", "lib/util").is_empty());
    }

    #[test]
    fn test_candidates_sorted_and_deduplicated() {
        let mut index = RuleIndex::new();
        index.add("ts", "shared/util", Label::new("", "shared", "b"));
        index.add("ts", "shared/util", Label::new("", "shared", "a"));
        index.add("ts", "shared/util", Label::new("", "shared", "b"));

        let names: Vec<_> = index
            .find("ts", "shared/util")
            .into_iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(index.len(), 1);
    }
}
