//! High-level operations.
//!
//! This module contains the implementation of quay commands.

pub mod quay_generate;

pub use quay_generate::{generate, generate_with, GenerateOptions, GenerationReport};
