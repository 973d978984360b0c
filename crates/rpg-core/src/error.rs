//! Typed error taxonomy shared by every stage (§7).
//!
//! Each component gets its own `thiserror` enum at its own crate boundary; this module only
//! holds the two categories that belong to the graph model itself plus the top-level
//! [`ErrorCategory`] tag every component error maps onto so the orchestrator can apply §7's
//! propagation policy uniformly.

use thiserror::Error;

/// Validation failures raised by [`crate::graph::RepoGraph::validate`].
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge references node `{node_id}` which does not exist in this graph")]
    DanglingEdge { node_id: String },

    #[error("node `{node_id}` is claimed as a child by more than one parent")]
    MultipleParents { node_id: String },

    #[error("two capability nodes share feature_path `{feature_path}`")]
    DuplicateFeaturePath { feature_path: String },

    #[error("file node `{node_id}` declares unknown feature `{feature_path}`")]
    UnknownFileFeature {
        node_id: String,
        feature_path: String,
    },

    #[error("class/function node `{node_id}` is missing a signature or doc")]
    IncompleteInterface { node_id: String },

    #[error("cycle detected among data_flow/order edges: {members:?}")]
    CycleDetected { members: Vec<String> },
}

/// Failures raised by [`crate::config`] and [`crate::storage`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The five error categories from §7, used by the orchestrator to decide whether a failure
/// is fatal (Configuration, Validation) or recoverable (Gateway, Sandbox, IO).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Gateway,
    Validation,
    Sandbox,
    Io,
}

impl ErrorCategory {
    /// Only Configuration and Validation errors abort a job outright (§7 Propagation policy).
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Configuration | Self::Validation)
    }
}

/// Any component error that can be classified into one of §7's categories.
pub trait Classify {
    fn category(&self) -> ErrorCategory;
}

impl Classify for GraphError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

impl Classify for ConfigError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}
