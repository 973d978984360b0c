//! # rpg-gen
//!
//! The Codegen Controller: synthesizes a test then an implementation for each callable RPG
//! node in topological order, repairing against sandbox feedback up to a retry budget.

pub mod codegen;

pub use codegen::{CodegenController, CodegenReport, NodeOutcome, NodeReport};
