//! Third-party package registries.
//!
//! A registry maps a module name that is not provided by the workspace
//! (`react`, `@scope/pkg/sub`) to the label of an external package.
//! Registries are pluggable; the default one reads the `package.json` at
//! each project root and points at the `node_modules` targets declared next
//! to it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::label::Label;
use crate::core::import::is_relative_import;

/// Name of the npm manifest read at project roots.
pub const PACKAGE_JSON: &str = "package.json";

/// Node.js builtin modules, importable with or without the `node:` prefix.
const NODE_BUILTINS: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "http", "http2",
    "https", "inspector", "module", "net", "os", "path", "perf_hooks", "process", "punycode",
    "querystring", "readline", "repl", "stream", "string_decoder", "sys", "timers", "tls",
    "trace_events", "tty", "url", "util", "v8", "vm", "wasi", "worker_threads", "zlib",
];

/// A source of external package identifiers.
pub trait PackageRegistry {
    /// Map a raw module name imported from a unit under `project_root` to
    /// the external package providing it.
    fn find(&self, project_root: &str, module: &str) -> Option<Label>;
}

/// Dependency tables of a `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,
}

impl PackageJson {
    /// Load a `package.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Every declared package name.
    pub fn package_names(&self) -> BTreeSet<String> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .chain(self.peer_dependencies.keys())
            .chain(self.optional_dependencies.keys())
            .cloned()
            .collect()
    }
}

/// Registry backed by the `package.json` files at project roots.
///
/// A package `pkg` declared at project root `root` is provided by the
/// target `//root:node_modules/pkg`.
#[derive(Debug, Clone, Default)]
pub struct NpmRegistry {
    repo: String,
    packages: HashMap<String, BTreeSet<String>>,
}

impl NpmRegistry {
    pub fn new(repo: impl Into<String>) -> Self {
        NpmRegistry {
            repo: repo.into(),
            packages: HashMap::new(),
        }
    }

    /// Load the manifests of the given project roots. Roots without a
    /// `package.json` declare no packages.
    pub fn load<'a>(
        workspace_root: &Path,
        repo: impl Into<String>,
        project_roots: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let mut registry = NpmRegistry::new(repo);
        for root in project_roots {
            let path: PathBuf = workspace_root.join(root).join(PACKAGE_JSON);
            if !path.is_file() {
                continue;
            }
            let manifest = PackageJson::load(&path)?;
            tracing::debug!(
                "loaded {} packages from {}",
                manifest.package_names().len(),
                path.display()
            );
            registry.add_project(root, manifest.package_names());
        }
        Ok(registry)
    }

    /// Declare packages available to units under `project_root`.
    pub fn add_project(&mut self, project_root: &str, names: impl IntoIterator<Item = String>) {
        self.packages
            .entry(project_root.to_string())
            .or_default()
            .extend(names);
    }
}

impl PackageRegistry for NpmRegistry {
    fn find(&self, project_root: &str, module: &str) -> Option<Label> {
        let package = package_name(module)?;
        let declared = self.packages.get(project_root)?;
        if !declared.contains(package) {
            return None;
        }
        Some(Label::new(
            self.repo.clone(),
            project_root,
            format!("node_modules/{}", package),
        ))
    }
}

/// Package part of a module name: `@scope/name` for scoped packages,
/// otherwise the first path segment.
pub fn package_name(module: &str) -> Option<&str> {
    if module.is_empty() || is_relative_import(module) || module.starts_with('/') {
        return None;
    }
    if module.starts_with('@') {
        let mut slashes = module.match_indices('/').map(|(idx, _)| idx);
        let _scope_end = slashes.next()?;
        return Some(match slashes.next() {
            Some(end) => &module[..end],
            None => module,
        });
    }
    Some(module.split('/').next().unwrap_or(module))
}

/// Whether a module names a Node.js builtin (`fs`, `fs/promises`, `node:test`).
pub fn is_node_builtin(module: &str) -> bool {
    if module.starts_with("node:") {
        return true;
    }
    let head = module.split('/').next().unwrap_or(module);
    NODE_BUILTINS.contains(&head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("react"), Some("react"));
        assert_eq!(package_name("lodash/fp"), Some("lodash"));
        assert_eq!(package_name("@scope/pkg"), Some("@scope/pkg"));
        assert_eq!(package_name("@scope/pkg/deep/path"), Some("@scope/pkg"));
        assert_eq!(package_name("@scope"), None);
        assert_eq!(package_name("./local"), None);
        assert_eq!(package_name(""), None);
    }

    #[test]
    fn test_node_builtins() {
        assert!(is_node_builtin("fs"));
        assert!(is_node_builtin("fs/promises"));
        assert!(is_node_builtin("node:test"));
        assert!(!is_node_builtin("react"));
        assert!(!is_node_builtin("fsevents"));
    }

    #[test]
    fn test_npm_registry_load() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("web")).unwrap();
        std::fs::write(
            tmp.path().join("web").join(PACKAGE_JSON),
            r#"{
  "name": "web",
  "dependencies": { "react": "^18.0.0" },
  "devDependencies": { "@types/node": "^20.0.0" }
}"#,
        )
        .unwrap();

        let registry = NpmRegistry::load(tmp.path(), "", ["", "web"]).unwrap();

        let label = registry.find("web", "react").unwrap();
        assert_eq!(label.to_string(), "//web:node_modules/react");
        assert_eq!(
            registry.find("web", "@types/node/fs").unwrap().name,
            "node_modules/@types/node"
        );
        assert!(registry.find("", "react").is_none());
        assert!(registry.find("web", "vue").is_none());
    }
}
