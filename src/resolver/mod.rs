//! Import-to-dependency resolution.
//!
//! Every import of a unit is normalized to a logical import path and then
//! resolved through a fixed sequence of tiers:
//!
//! 1. Self-imports are skipped.
//! 2. `resolve` directive overrides.
//! 3. The workspace rule index. More than one candidate is fatal.
//! 4. Node.js builtins (outside browser environments).
//! 5. The third-party package registry.
//! 6. Anything left is an invalid dependency when validation is enabled,
//!    unless the module is ignored.
//!
//! The resolver never exits the process. Fatal conditions are returned in
//! the [`Resolution`] and accumulated by the caller across the whole run.

pub mod errors;
pub mod index;
pub mod normalize;
pub mod overrides;
pub mod registry;

pub use errors::ResolveError;
pub use index::RuleIndex;
pub use overrides::OverrideTable;
pub use registry::{NpmRegistry, PackageRegistry};

use std::collections::BTreeSet;
use std::fmt;

use crate::core::config::{ConfigTree, NodeId};
use crate::core::import::ImportStatement;
use crate::core::label::Label;
use crate::core::unit::GenerationUnit;
use normalize::{join, to_workspace_import_path};
use registry::is_node_builtin;

/// Language name used for the rule index and `resolve` directives.
pub const LANGUAGE_NAME: &str = "ts";

/// Language names accepted in `resolve` directives.
pub const LANGUAGE_NAMES: &[&str] = &["ts", "js", "typescript", "javascript"];

/// Environment variable naming a dependency string to explain.
pub const EXPLAIN_DEPENDENCY_ENV: &str = "EXPLAIN_DEPENDENCY";

/// Which tier produced a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tier {
    Override,
    Index,
    ThirdParty(String),
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Override => write!(f, "using the \"gazelle:resolve\" directive"),
            Tier::Index => write!(f, "from the first-party indexed labels"),
            Tier::ThirdParty(pkg) => write!(f, "from the third-party package \"{}\"", pkg),
        }
    }
}

/// Outcome of resolving one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Dependency strings rendered relative to the unit, sorted
    pub deps: BTreeSet<String>,
    pub errors: Vec<ResolveError>,
}

impl Resolution {
    /// Whether any import failed fatally.
    pub fn is_fatal(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Resolves the imports of generated units.
pub struct Resolver<'a> {
    config: &'a ConfigTree,
    index: &'a RuleIndex,
    registry: &'a dyn PackageRegistry,
    repo: &'a str,
    explain: Option<&'a str>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        config: &'a ConfigTree,
        index: &'a RuleIndex,
        registry: &'a dyn PackageRegistry,
        repo: &'a str,
    ) -> Self {
        Resolver {
            config,
            index,
            registry,
            repo,
            explain: None,
        }
    }

    /// Log the origin of every import resolving to `dep`, and of every
    /// unresolved import written as `dep` that is dropped.
    pub fn with_explain(mut self, dep: Option<&'a str>) -> Self {
        self.explain = dep.filter(|d| !d.is_empty());
        self
    }

    /// Resolve the imports of `unit`, configured by `node`.
    pub fn resolve(
        &self,
        unit: &GenerationUnit,
        node: NodeId,
        imports: &BTreeSet<ImportStatement>,
    ) -> Resolution {
        let from = unit.label(self.repo);
        let provides = unit.provides();
        let mut resolution = Resolution::default();

        for stmt in imports {
            let imp = to_workspace_import_path(&unit.package, &stmt.source_path, &stmt.path);
            tracing::debug!("find({}): {}", from.name, imp);

            if provides.contains(&imp) {
                tracing::debug!("skipping self-import `{}` in {}", stmt.path, from);
                continue;
            }

            if let Some(target) = self.config.overrides().find(&unit.package, &imp) {
                let target = self.absolute(target, &from);
                if !target.same_target(&from) {
                    self.add(&mut resolution, &from, stmt, &target, Tier::Override);
                }
                continue;
            }

            let matches: Vec<&Label> = self
                .index
                .find(LANGUAGE_NAME, &imp)
                .into_iter()
                .filter(|label| !label.same_target(&from))
                .collect();
            match matches.as_slice() {
                [] => {}
                [single] => {
                    self.add(&mut resolution, &from, stmt, single, Tier::Index);
                    continue;
                }
                candidates => {
                    resolution.errors.push(ResolveError::Ambiguous {
                        from: from.clone(),
                        import: stmt.path.clone(),
                        source_path: join(&[&unit.package, &stmt.source_path]),
                        line: stmt.line,
                        candidates: candidates.iter().map(|l| l.to_string()).collect(),
                    });
                    continue;
                }
            }

            let config = self.config.node(node);
            if config.environment().has_node_builtins() && is_node_builtin(&stmt.path) {
                tracing::debug!("`{}` is a node builtin", stmt.path);
                continue;
            }

            if let Some(target) = self.registry.find(config.project_root(), &stmt.path) {
                let package = target.name.trim_start_matches("node_modules/").to_string();
                self.add(&mut resolution, &from, stmt, &target, Tier::ThirdParty(package));
                continue;
            }

            if self.config.ignores_dependency(node, &stmt.path) {
                tracing::debug!("ignoring unresolved `{}` in {}", stmt.path, from);
                continue;
            }

            if config.validate_imports() {
                resolution.errors.push(ResolveError::InvalidDependency {
                    from: from.clone(),
                    import: stmt.path.clone(),
                    source_path: join(&[&unit.package, &stmt.source_path]),
                    line: stmt.line,
                });
            } else if self.explains(&stmt.path) {
                tracing::info!(
                    "Explaining dependency ({}): in the target \"{}\", the file \"{}\" imports \"{}\" at line {}, which is unresolved and dropped because import validation is off",
                    stmt.path,
                    from,
                    join(&[&from.pkg, &stmt.source_path]),
                    stmt.path,
                    stmt.line
                );
            } else {
                tracing::debug!("dropping unresolved `{}` in {}", stmt.path, from);
            }
        }

        resolution
    }

    /// Qualify a label written in a directive against the importing unit.
    fn absolute(&self, label: &Label, from: &Label) -> Label {
        if label.relative {
            return Label::new(from.repo.clone(), from.pkg.clone(), label.name.clone());
        }
        let mut label = label.clone();
        if label.repo.is_empty() {
            label.repo = from.repo.clone();
        }
        label
    }

    fn explains(&self, dep: &str) -> bool {
        self.explain == Some(dep)
    }

    fn add(
        &self,
        resolution: &mut Resolution,
        from: &Label,
        stmt: &ImportStatement,
        target: &Label,
        tier: Tier,
    ) {
        let dep = target.rel(self.repo, &from.pkg).to_string();
        if self.explains(&dep) {
            tracing::info!(
                "Explaining dependency ({}): in the target \"{}\", the file \"{}\" imports \"{}\" at line {}, which resolves {}",
                dep,
                from,
                join(&[&from.pkg, &stmt.source_path]),
                stmt.path,
                stmt.line,
                tier
            );
        }
        resolution.deps.insert(dep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::directive::{BuildFile, DEFAULT_DIRECTIVE_PREFIX};
    use crate::core::unit::{UnitBuilder, UnitKind};

    fn unit(pkg: &str, name: &str, srcs: &[&str]) -> GenerationUnit {
        UnitBuilder::new(UnitKind::Library, name, "", pkg)
            .srcs(srcs.iter().copied())
            .build()
    }

    fn imports(items: &[(&str, &str, u32)]) -> BTreeSet<ImportStatement> {
        items
            .iter()
            .map(|(path, src, line)| ImportStatement::new(*path, *src, *line))
            .collect()
    }

    fn configure(tree: &mut ConfigTree, rel: &str, content: &str) -> NodeId {
        let file = BuildFile::parse("BUILD.bazel", content, DEFAULT_DIRECTIVE_PREFIX);
        tree.configure(rel, Some(&file)).unwrap()
    }

    struct Fixture {
        tree: ConfigTree,
        index: RuleIndex,
        registry: NpmRegistry,
    }

    impl Fixture {
        fn new(units: &[&GenerationUnit]) -> Self {
            let mut index = RuleIndex::new();
            for unit in units {
                index.add_unit(LANGUAGE_NAME, "", unit);
            }
            Fixture {
                tree: ConfigTree::new(),
                index,
                registry: NpmRegistry::new(""),
            }
        }

        fn resolve(
            &mut self,
            unit: &GenerationUnit,
            imports: &BTreeSet<ImportStatement>,
        ) -> Resolution {
            let node = self.tree.resolve(&unit.package);
            Resolver::new(&self.tree, &self.index, &self.registry, "").resolve(unit, node, imports)
        }
    }

    #[test]
    fn test_first_party_resolution() {
        let app = unit("app", "app", &["main.ts"]);
        let util = unit("lib/util", "util", &["index.ts", "strings.ts"]);
        let mut fx = Fixture::new(&[&app, &util]);

        let res = fx.resolve(
            &app,
            &imports(&[("../lib/util/strings", "main.ts", 1), ("lib/util", "main.ts", 2)]),
        );
        assert!(!res.is_fatal(), "{:?}", res.errors);
        assert_eq!(res.deps.into_iter().collect::<Vec<_>>(), vec!["//lib/util"]);
    }

    #[test]
    fn test_self_import_is_excluded() {
        let app = unit("app", "app", &["main.ts", "helpers.ts"]);
        let mut fx = Fixture::new(&[&app]);

        let res = fx.resolve(&app, &imports(&[("./helpers", "main.ts", 1)]));
        assert!(res.deps.is_empty());
        assert!(!res.is_fatal());
    }

    #[test]
    fn test_self_match_filtered_from_index() {
        // Another unit in the same package shares a provided path with `app`.
        let app = unit("app", "app", &["main.ts"]);
        let other = unit("app", "app_extra", &["shared.ts"]);
        let mut fx = Fixture::new(&[&app, &other]);
        fx.index.add(LANGUAGE_NAME, "app/shared", app.label(""));

        let res = fx.resolve(&app, &imports(&[("./shared", "main.ts", 3)]));
        assert!(!res.is_fatal(), "{:?}", res.errors);
        assert_eq!(res.deps.into_iter().collect::<Vec<_>>(), vec![":app_extra"]);
    }

    #[test]
    fn test_ambiguity_names_every_candidate() {
        let app = unit("app", "app", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        fx.index.add(LANGUAGE_NAME, "shared/util", Label::new("", "shared", "util_a"));
        fx.index.add(LANGUAGE_NAME, "shared/util", Label::new("", "shared", "util_b"));

        let res = fx.resolve(&app, &imports(&[("shared/util", "main.ts", 7)]));
        assert!(res.is_fatal());
        assert!(res.deps.is_empty());
        match &res.errors[..] {
            [ResolveError::Ambiguous {
                candidates,
                line,
                source_path,
                ..
            }] => {
                assert_eq!(candidates, &vec!["//shared:util_a", "//shared:util_b"]);
                assert_eq!(*line, 7);
                assert_eq!(source_path, "app/main.ts");
            }
            other => panic!("unexpected errors: {:?}", other),
        }
    }

    #[test]
    fn test_override_precedes_index() {
        let app = unit("app", "app", &["main.ts"]);
        let util = unit("shared/util", "util", &["index.ts"]);
        let mut fx = Fixture::new(&[&app, &util]);
        configure(
            &mut fx.tree,
            "",
            "# gazelle:resolve ts shared/util //vendor:util\n",
        );

        let res = fx.resolve(&app, &imports(&[("shared/util", "main.ts", 1)]));
        assert_eq!(res.deps.into_iter().collect::<Vec<_>>(), vec!["//vendor:util"]);
    }

    #[test]
    fn test_override_resolves_ambiguity() {
        let app = unit("app", "app", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        fx.index.add(LANGUAGE_NAME, "shared/util", Label::new("", "shared", "util_a"));
        fx.index.add(LANGUAGE_NAME, "shared/util", Label::new("", "shared", "util_b"));
        configure(
            &mut fx.tree,
            "",
            "# gazelle:resolve ts shared/util //shared:util_b\n",
        );

        let res = fx.resolve(&app, &imports(&[("shared/util", "main.ts", 1)]));
        assert!(!res.is_fatal());
        assert_eq!(res.deps.into_iter().collect::<Vec<_>>(), vec!["//shared:util_b"]);
    }

    #[test]
    fn test_override_pointing_at_self_is_skipped() {
        let app = unit("app", "app", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        configure(&mut fx.tree, "", "# gazelle:resolve ts virtual/mod //app\n");
        configure(&mut fx.tree, "app", "# gazelle:resolve ts other/mod :app\n");

        let res = fx.resolve(
            &app,
            &imports(&[("virtual/mod", "main.ts", 1), ("other/mod", "main.ts", 2)]),
        );
        assert!(res.deps.is_empty());
        assert!(!res.is_fatal());
    }

    #[test]
    fn test_relative_override_label_uses_unit_package() {
        let app = unit("app", "app", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        configure(&mut fx.tree, "app", "# gazelle:resolve ts generated/api :api_client\n");

        let res = fx.resolve(&app, &imports(&[("generated/api", "main.ts", 1)]));
        assert_eq!(res.deps.into_iter().collect::<Vec<_>>(), vec![":api_client"]);
    }

    #[test]
    fn test_override_labels_take_the_repository_name() {
        let app = unit("app", "app", &["main.ts"]);
        let mut tree = ConfigTree::new();
        configure(&mut tree, "", "");
        configure(
            &mut tree,
            "app",
            "# gazelle:resolve ts virtual/mod //app\n# gazelle:resolve ts gen/api //app:api\n",
        );
        let index = RuleIndex::new();
        let registry = NpmRegistry::new("main");
        let node = tree.resolve("app");

        let res = Resolver::new(&tree, &index, &registry, "main").resolve(
            &app,
            node,
            &imports(&[("virtual/mod", "main.ts", 1), ("gen/api", "main.ts", 2)]),
        );
        assert!(!res.is_fatal(), "{:?}", res.errors);
        assert_eq!(res.deps.into_iter().collect::<Vec<_>>(), vec![":api"]);
    }

    #[test]
    fn test_explain_matches_dependency_or_import() {
        let fx = Fixture::new(&[]);
        let resolver = Resolver::new(&fx.tree, &fx.index, &fx.registry, "");
        assert!(!resolver.explains("left-pad"));

        let resolver = resolver.with_explain(Some("left-pad"));
        assert!(resolver.explains("left-pad"));
        assert!(!resolver.explains("//left-pad"));

        let resolver = resolver.with_explain(Some(""));
        assert!(!resolver.explains(""));
    }

    #[test]
    fn test_unresolved_is_invalid_when_validating() {
        let app = unit("app", "app", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);

        let res = fx.resolve(&app, &imports(&[("left-pad", "main.ts", 2)]));
        assert!(res.is_fatal());
        assert!(matches!(
            &res.errors[0],
            ResolveError::InvalidDependency { import, line: 2, .. } if import == "left-pad"
        ));
    }

    #[test]
    fn test_validation_disabled_drops_import() {
        let app = unit("app", "app", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        configure(&mut fx.tree, "", "# gazelle:ts_validate_import_statements false\n");

        let res = fx.resolve(&app, &imports(&[("left-pad", "main.ts", 2)]));
        assert!(!res.is_fatal());
        assert!(res.deps.is_empty());
    }

    #[test]
    fn test_ignore_directive_at_ancestor_suppresses_validation() {
        let app = unit("app/ui", "ui", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        configure(&mut fx.tree, "", "# gazelle:ts_ignore_dependencies left-pad, @internal/x\n");
        configure(&mut fx.tree, "app", "");
        configure(&mut fx.tree, "app/ui", "");

        let res = fx.resolve(
            &app,
            &imports(&[("left-pad", "main.ts", 1), ("@internal/x", "main.ts", 2)]),
        );
        assert!(!res.is_fatal(), "{:?}", res.errors);
        assert!(res.deps.is_empty());
    }

    #[test]
    fn test_third_party_and_builtins() {
        let app = unit("web/app", "app", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        configure(&mut fx.tree, "web", "# gazelle:ts_root\n");
        fx.registry.add_project("web", ["react".to_string(), "@scope/ui".to_string()]);

        let res = fx.resolve(
            &app,
            &imports(&[
                ("react", "main.ts", 1),
                ("@scope/ui/button", "main.ts", 2),
                ("fs", "main.ts", 3),
                ("node:path", "main.ts", 4),
            ]),
        );
        assert!(!res.is_fatal(), "{:?}", res.errors);
        assert_eq!(
            res.deps.into_iter().collect::<Vec<_>>(),
            vec!["//web:node_modules/@scope/ui", "//web:node_modules/react"]
        );
    }

    #[test]
    fn test_browser_environment_has_no_builtins() {
        let app = unit("web", "web", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        configure(&mut fx.tree, "web", "# gazelle:ts_environment browser\n");

        let res = fx.resolve(&app, &imports(&[("fs", "main.ts", 1)]));
        assert!(res.is_fatal());
    }

    #[test]
    fn test_index_file_collapsing() {
        let app = unit("app", "app", &["main.ts"]);
        let widgets = unit("ui", "ui", &["widgets/index.ts"]);
        let mut fx = Fixture::new(&[&app, &widgets]);

        for import in ["ui/widgets", "ui/widgets/index", "../ui/widgets", "../ui/widgets/index.js"] {
            let res = fx.resolve(&app, &imports(&[(import, "main.ts", 1)]));
            assert_eq!(
                res.deps.into_iter().collect::<Vec<_>>(),
                vec!["//ui"],
                "import {:?}",
                import
            );
        }
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let app = unit("app", "app", &["main.ts", "view.tsx"]);
        let a = unit("lib/a", "a", &["index.ts"]);
        let b = unit("lib/b", "b", &["index.ts"]);
        let mut fx = Fixture::new(&[&app, &a, &b]);
        fx.registry.add_project("", ["react".to_string()]);

        let stmts = imports(&[
            ("lib/b", "view.tsx", 1),
            ("react", "view.tsx", 2),
            ("../lib/a", "main.ts", 1),
            ("lib/b", "main.ts", 5),
        ]);

        let first = fx.resolve(&app, &stmts);
        let second = fx.resolve(&app, &stmts);
        assert_eq!(first, second);
        assert_eq!(
            first.deps.into_iter().collect::<Vec<_>>(),
            vec!["//:node_modules/react", "//lib/a", "//lib/b"]
        );
    }

    #[test]
    fn test_errors_from_every_import_are_collected() {
        let app = unit("app", "app", &["main.ts"]);
        let mut fx = Fixture::new(&[&app]);
        fx.index.add(LANGUAGE_NAME, "dup", Label::new("", "x", "one"));
        fx.index.add(LANGUAGE_NAME, "dup", Label::new("", "y", "two"));

        let res = fx.resolve(
            &app,
            &imports(&[("dup", "main.ts", 1), ("missing-a", "main.ts", 2), ("missing-b", "main.ts", 3)]),
        );
        assert_eq!(res.errors.len(), 3);
    }
}
