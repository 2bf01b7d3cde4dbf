//! Core data structures for quay.
//!
//! This module contains the foundational types used throughout quay:
//! - Build labels and import statements
//! - Build files, their directives and manually declared rules
//! - The per-directory configuration tree
//! - Generation units
//! - Workspace discovery

pub mod config;
pub mod directive;
pub mod import;
pub mod label;
pub mod unit;
pub mod workspace;

pub use config::{ConfigNode, ConfigTree, Environment, GenerationMode, NodeId};
pub use directive::{BuildFile, Directive, DirectiveError, ManualRule};
pub use import::ImportStatement;
pub use label::Label;
pub use unit::{GenerationUnit, UnitBuilder, UnitKind};
pub use workspace::{find_workspace_root, Workspace, WorkspaceError};
