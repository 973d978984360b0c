//! Core types and storage for the Repository Planning Graph (RPG).
//!
//! Provides the graph data model ([`graph::RepoGraph`]), the typed error taxonomy shared by
//! every stage, layered configuration, the `Job` boundary record and its store abstraction,
//! and JSON persistence for both.

pub mod config;
pub mod error;
pub mod graph;
pub mod job;
pub mod schema;
pub mod storage;
