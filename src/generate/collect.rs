//! Source collection for one generation unit.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::core::config::{ConfigTree, NodeId};
use crate::core::directive::is_package_boundary;
use crate::resolver::normalize::has_importable_extension;
use crate::util::fs::{is_hidden, rel_slash};

const EXCLUDE_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to walk `{}`", dir.display())]
    Walk {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid exclude pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Gathers the source files of a unit rooted at a directory.
#[derive(Debug, Clone)]
pub struct SourceCollector {
    build_file_names: Vec<String>,
    skip_dirs: Vec<String>,
}

impl SourceCollector {
    pub fn new(build_file_names: Vec<String>, skip_dirs: Vec<String>) -> Self {
        SourceCollector {
            build_file_names,
            skip_dirs,
        }
    }

    /// Collect importable files for the unit at `dir`, relative to `dir`.
    ///
    /// Immediate files are always included. In coarse-grained mode the walk
    /// continues into subdirectories until it reaches a package boundary,
    /// and exclusion patterns apply to the files found there.
    pub fn collect(
        &self,
        dir: &Path,
        tree: &ConfigTree,
        node: NodeId,
    ) -> Result<BTreeSet<String>, CollectError> {
        let coarse = tree.node(node).is_coarse_grained();
        let max_depth = if coarse { usize::MAX } else { 1 };
        let excludes = if coarse {
            compile_patterns(&tree.excluded_patterns(node))?
        } else {
            Vec::new()
        };

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_unit_boundary(entry));

        let mut files = BTreeSet::new();
        for entry in walker {
            let entry = entry.map_err(|source| CollectError::Walk {
                dir: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !has_importable_extension(&name) || tree.ignores_file(node, &name) {
                continue;
            }

            let rel = rel_slash(dir, entry.path());
            if entry.depth() > 1 && is_excluded(&excludes, &rel) {
                tracing::debug!("excluding {}", rel);
                continue;
            }
            files.insert(rel);
        }

        Ok(files)
    }

    /// Directories that belong to another unit or are never walked.
    fn is_unit_boundary(&self, entry: &DirEntry) -> bool {
        // The unit's own directory is a package by definition.
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        is_hidden(&name)
            || self.skip_dirs.iter().any(|skip| *skip == *name)
            || is_package_boundary(entry.path(), &self.build_file_names)
    }
}

fn compile_patterns(patterns: &[&str]) -> Result<Vec<Pattern>, CollectError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| CollectError::Pattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

fn is_excluded(patterns: &[Pattern], rel: &str) -> bool {
    patterns
        .iter()
        .any(|p| p.matches_with(rel, EXCLUDE_MATCH_OPTIONS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::directive::{BuildFile, DEFAULT_DIRECTIVE_PREFIX};
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    fn collector() -> SourceCollector {
        SourceCollector::new(
            vec!["BUILD.bazel".to_string(), "BUILD".to_string()],
            vec!["node_modules".to_string()],
        )
    }

    fn configure(tree: &mut ConfigTree, rel: &str, content: &str) -> NodeId {
        let file = BuildFile::parse("BUILD.bazel", content, DEFAULT_DIRECTIVE_PREFIX);
        tree.configure(rel, Some(&file)).unwrap()
    }

    #[test]
    fn test_fine_grained_collects_immediate_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "main.ts");
        touch(tmp.path(), "view.tsx");
        touch(tmp.path(), "README.md");
        touch(tmp.path(), "sub/nested.ts");

        let mut tree = ConfigTree::new();
        let node = configure(&mut tree, "", "");

        let files = collector().collect(tmp.path(), &tree, node).unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["main.ts", "view.tsx"]);
    }

    #[test]
    fn test_coarse_grained_stops_at_boundaries() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "index.ts");
        touch(tmp.path(), "a/one.ts");
        touch(tmp.path(), "a/b/two.ts");
        touch(tmp.path(), "pkg/BUILD.bazel");
        touch(tmp.path(), "pkg/three.ts");
        touch(tmp.path(), "node_modules/dep/index.js");
        touch(tmp.path(), ".cache/x.ts");

        let mut tree = ConfigTree::new();
        let node = configure(&mut tree, "", "# gazelle:ts_generation_mode project\n");

        let files = collector().collect(tmp.path(), &tree, node).unwrap();
        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec!["a/b/two.ts", "a/one.ts", "index.ts"]
        );
    }

    #[test]
    fn test_exclusions_apply_to_subtree_only() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "top.gen.ts");
        touch(tmp.path(), "a/keep.ts");
        touch(tmp.path(), "a/skip.gen.ts");
        touch(tmp.path(), "fixtures/data.ts");

        let mut tree = ConfigTree::new();
        let node = configure(
            &mut tree,
            "",
            "# gazelle:ts_generation_mode project\n\
             # gazelle:exclude **/*.gen.ts\n\
             # gazelle:exclude fixtures/*\n",
        );

        let files = collector().collect(tmp.path(), &tree, node).unwrap();
        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec!["a/keep.ts", "top.gen.ts"]
        );
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/b/deep.ts");
        touch(tmp.path(), "a/shallow.ts");

        let mut tree = ConfigTree::new();
        let node = configure(
            &mut tree,
            "",
            "# gazelle:ts_generation_mode project\n# gazelle:exclude a/*\n",
        );

        let files = collector().collect(tmp.path(), &tree, node).unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["a/b/deep.ts"]);
    }

    #[test]
    fn test_ignored_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "main.ts");
        touch(tmp.path(), "legacy.ts");
        touch(tmp.path(), "a/legacy.ts");

        let mut tree = ConfigTree::new();
        let node = configure(
            &mut tree,
            "",
            "# gazelle:ts_generation_mode project\n# gazelle:ts_ignore_files legacy.ts\n",
        );

        let files = collector().collect(tmp.path(), &tree, node).unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["main.ts"]);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/b.ts");

        let mut tree = ConfigTree::new();
        let node = configure(
            &mut tree,
            "",
            "# gazelle:ts_generation_mode project\n# gazelle:exclude a/[\n",
        );

        assert!(matches!(
            collector().collect(tmp.path(), &tree, node),
            Err(CollectError::Pattern { .. })
        ));
    }

    #[test]
    fn test_missing_directory_is_a_walk_error() {
        let tmp = TempDir::new().unwrap();
        let tree = ConfigTree::new();

        let err = collector()
            .collect(&tmp.path().join("missing"), &tree, tree.root_id())
            .unwrap_err();
        assert!(matches!(err, CollectError::Walk { .. }));
    }
}
