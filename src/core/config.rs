//! Per-directory generation configuration.
//!
//! Every visited directory gets a [`ConfigNode`] derived from its parent's
//! node and then adjusted by the directives in the directory's build file.
//! Nodes live in a [`ConfigTree`] arena keyed by slash-separated directory
//! path (`""` is the workspace root) and are never mutated once their
//! directory has been configured.
//!
//! Scalar settings are copied from the parent on creation. Collections
//! (exclusions, ignored files and dependencies) only hold the node's own
//! entries and are merged with the ancestors' when queried.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::core::directive::{self, BuildFile, DirectiveError};
use crate::resolver::overrides::OverrideTable;

/// Token replaced with the directory base name in naming templates.
pub const PACKAGE_NAME_TOKEN: &str = "$package_name$";

/// Unit boundary selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// One unit per package (fine-grained)
    #[default]
    Package,
    /// One unit per project subtree (coarse-grained)
    Project,
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(GenerationMode::Package),
            "project" => Ok(GenerationMode::Project),
            _ => Err("possible values are `package` and `project`".to_string()),
        }
    }
}

/// Runtime environment of the sources, which decides what builtin modules
/// are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Node,
    Browser,
    #[default]
    Other,
}

impl Environment {
    /// Whether Node.js builtin modules can be imported.
    pub fn has_node_builtins(&self) -> bool {
        !matches!(self, Environment::Browser)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Environment::Node),
            "browser" => Ok(Environment::Browser),
            "other" => Ok(Environment::Other),
            _ => Err("possible values are `node`, `browser` and `other`".to_string()),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Node => write!(f, "node"),
            Environment::Browser => write!(f, "browser"),
            Environment::Other => write!(f, "other"),
        }
    }
}

/// Index of a node inside its [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Configuration for one directory.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    parent: Option<NodeId>,
    rel: String,

    generation_enabled: bool,
    project_root: String,
    environment: Environment,
    validate_imports: bool,
    mode: GenerationMode,
    library_naming: String,
    test_naming: String,

    excluded_patterns: Vec<String>,
    ignored_dependencies: BTreeSet<String>,
    ignored_files: BTreeSet<String>,
}

impl ConfigNode {
    /// The workspace root configuration with all defaults.
    fn root() -> Self {
        ConfigNode {
            parent: None,
            rel: String::new(),
            generation_enabled: true,
            project_root: String::new(),
            environment: Environment::Other,
            validate_imports: true,
            mode: GenerationMode::Package,
            library_naming: PACKAGE_NAME_TOKEN.to_string(),
            test_naming: format!("{}_test", PACKAGE_NAME_TOKEN),
            excluded_patterns: Vec::new(),
            ignored_dependencies: BTreeSet::new(),
            ignored_files: BTreeSet::new(),
        }
    }

    /// Derive a child node that inherits every scalar setting.
    fn child(&self, parent: NodeId, rel: &str) -> Self {
        ConfigNode {
            parent: Some(parent),
            rel: rel.to_string(),
            generation_enabled: self.generation_enabled,
            project_root: self.project_root.clone(),
            environment: self.environment,
            validate_imports: self.validate_imports,
            mode: self.mode,
            library_naming: self.library_naming.clone(),
            test_naming: self.test_naming.clone(),
            excluded_patterns: Vec::new(),
            ignored_dependencies: BTreeSet::new(),
            ignored_files: BTreeSet::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Directory this node configures.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    pub fn generation_enabled(&self) -> bool {
        self.generation_enabled
    }

    /// Directory treated as the project root for naming and visibility.
    pub fn project_root(&self) -> &str {
        &self.project_root
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn validate_imports(&self) -> bool {
        self.validate_imports
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn is_coarse_grained(&self) -> bool {
        self.mode == GenerationMode::Project
    }

    /// Render the library target name for a package.
    pub fn render_library_name(&self, package_name: &str) -> String {
        self.library_naming.replace(PACKAGE_NAME_TOKEN, package_name)
    }

    /// Render the test target name for a package.
    pub fn render_test_name(&self, package_name: &str) -> String {
        self.test_naming.replace(PACKAGE_NAME_TOKEN, package_name)
    }
}

/// Workspace-wide mapping from directory to configuration.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    nodes: Vec<ConfigNode>,
    by_rel: HashMap<String, NodeId>,
    overrides: OverrideTable,
    root_configured: bool,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTree {
    /// Create a tree holding only the workspace root node.
    pub fn new() -> Self {
        let mut by_rel = HashMap::new();
        by_rel.insert(String::new(), NodeId(0));
        ConfigTree {
            nodes: vec![ConfigNode::root()],
            by_rel,
            overrides: OverrideTable::new(),
            root_configured: false,
        }
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &ConfigNode {
        &self.nodes[id.0]
    }

    /// Parent of a node, if any.
    pub fn parent_of(&self, id: NodeId) -> Option<&ConfigNode> {
        self.node(id).parent.map(|p| self.node(p))
    }

    /// Resolve-directive overrides collected from every configured directory.
    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Return the node for `rel`, creating it from the parent directory's
    /// node when it has not been visited yet.
    ///
    /// Ancestors must be configured first; a directory whose parent is
    /// unknown derives from the workspace root.
    pub fn resolve(&mut self, rel: &str) -> NodeId {
        if let Some(id) = self.by_rel.get(rel) {
            return *id;
        }
        let parent_id = self.parent_id_for(rel);
        let child = self.node(parent_id).child(parent_id, rel);
        self.insert(rel, child)
    }

    /// Create the node for `rel` and apply the directives of its build file.
    ///
    /// The node is only inserted once every directive has been applied, so it
    /// is never observed half-configured.
    pub fn configure(
        &mut self,
        rel: &str,
        build_file: Option<&BuildFile>,
    ) -> Result<NodeId, DirectiveError> {
        if let Some(&id) = self.by_rel.get(rel) {
            if id == self.root_id() && !self.root_configured {
                // The root node exists up front; its directives still apply once.
                let mut root = self.node(id).clone();
                if let Some(file) = build_file {
                    self.apply_directives(&mut root, file)?;
                }
                self.nodes[id.0] = root;
                self.root_configured = true;
            }
            return Ok(id);
        }

        let parent_id = self.parent_id_for(rel);
        let mut node = self.node(parent_id).child(parent_id, rel);
        if let Some(file) = build_file {
            self.apply_directives(&mut node, file)?;
        }
        Ok(self.insert(rel, node))
    }

    fn parent_id_for(&self, rel: &str) -> NodeId {
        let mut current = rel;
        while let Some((parent, _)) = current.rsplit_once('/') {
            if let Some(id) = self.by_rel.get(parent) {
                return *id;
            }
            current = parent;
        }
        self.root_id()
    }

    fn insert(&mut self, rel: &str, node: ConfigNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.by_rel.insert(rel.to_string(), id);
        id
    }

    fn apply_directives(
        &mut self,
        node: &mut ConfigNode,
        file: &BuildFile,
    ) -> Result<(), DirectiveError> {
        for d in file.directives() {
            let value = d.value.trim();
            match d.key.as_str() {
                directive::EXCLUDE_DIRECTIVE => {
                    node.excluded_patterns.push(value.to_string());
                }
                directive::GENERATION_DIRECTIVE => match value {
                    "enabled" => node.generation_enabled = true,
                    "disabled" => node.generation_enabled = false,
                    _ => {
                        return Err(file.directive_error(
                            d,
                            "possible values are `enabled` and `disabled`",
                        ))
                    }
                },
                directive::ROOT_DIRECTIVE => {
                    node.project_root = node.rel.clone();
                }
                directive::IGNORE_DEPENDENCIES_DIRECTIVE => {
                    node.ignored_dependencies.extend(split_list(value));
                }
                directive::IGNORE_FILES_DIRECTIVE => {
                    node.ignored_files.extend(split_list(value));
                }
                directive::VALIDATE_IMPORTS_DIRECTIVE => match parse_bool(value) {
                    Some(v) => node.validate_imports = v,
                    None => {
                        return Err(file.directive_error(d, "expected a boolean such as `true` or `false`"))
                    }
                },
                directive::GENERATION_MODE_DIRECTIVE => match value.parse() {
                    Ok(mode) => node.mode = mode,
                    Err(help) => return Err(file.directive_error(d, help)),
                },
                directive::ENVIRONMENT_DIRECTIVE => match value.parse() {
                    Ok(env) => node.environment = env,
                    Err(help) => return Err(file.directive_error(d, help)),
                },
                directive::LIBRARY_NAMING_DIRECTIVE => {
                    node.library_naming = value.to_string();
                }
                directive::TEST_NAMING_DIRECTIVE => {
                    node.test_naming = value.to_string();
                }
                directive::RESOLVE_DIRECTIVE => {
                    if let Err(help) = self.overrides.add_directive(&node.rel, value) {
                        return Err(file.directive_error(d, help));
                    }
                }
                other => {
                    tracing::warn!(
                        "{}:{}: ignoring unknown directive `{}`",
                        file.path().display(),
                        d.line,
                        other
                    );
                }
            }
        }
        Ok(())
    }

    /// Whether a dependency name is ignored at this node or any ancestor.
    pub fn ignores_dependency(&self, id: NodeId, dep: &str) -> bool {
        let dep = dep.trim();
        self.ancestors(id).any(|n| n.ignored_dependencies.contains(dep))
    }

    /// Whether a file base name is ignored at this node or any ancestor.
    pub fn ignores_file(&self, id: NodeId, file: &str) -> bool {
        let file = file.trim();
        self.ancestors(id).any(|n| n.ignored_files.contains(file))
    }

    /// Exclusion globs of this node and its ancestors, nearest last.
    pub fn excluded_patterns(&self, id: NodeId) -> Vec<&str> {
        let mut chain: Vec<&ConfigNode> = self.ancestors(id).collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|n| n.excluded_patterns.iter().map(String::as_str))
            .collect()
    }

    /// Iterate from a node up to the workspace root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &ConfigNode> {
        let mut next = Some(id);
        std::iter::from_fn(move || {
            let current = next?;
            let node = self.node(current);
            next = node.parent;
            Some(node)
        })
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts `1`, `t`, `true`, `0`, `f` and `false` in any case.
fn parse_bool(value: &str) -> Option<bool> {
    let is = |lit: &str| value.eq_ignore_ascii_case(lit);
    if is("1") || is("t") || is("true") {
        Some(true)
    } else if is("0") || is("f") || is("false") {
        Some(false)
    } else {
        None
    }
}
