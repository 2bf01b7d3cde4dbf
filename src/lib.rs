//! Quay - infers TypeScript build targets and their dependencies
//!
//! This crate provides the core library functionality for quay: the
//! per-directory configuration tree, source collection, import
//! extraction and the dependency resolver.

pub mod core;
pub mod generate;
pub mod ops;
pub mod parser;
pub mod resolver;
pub mod util;

/// Test utilities for quay unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides on-disk workspace fixtures and mock parsers.
#[cfg(test)]
pub mod test_support;

pub use core::{
    config::ConfigTree, import::ImportStatement, label::Label, unit::GenerationUnit,
    workspace::Workspace,
};

pub use resolver::{Resolution, Resolver};
pub use util::context::GlobalContext;
