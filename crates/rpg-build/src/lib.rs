//! Proposal and Implementation controllers (§4.5, §4.6): turn a project goal into a
//! populated Repository Planning Graph, ready for the codegen stage.

pub mod acceptance;
pub mod capability_graph;
pub mod error;
pub mod implementation;
pub mod proposal;

pub use error::BuildError;
pub use implementation::ImplementationController;
pub use proposal::ProposalController;
