//! Core shared types for Fete generation flows.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod name;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier attached to a single flow invocation.
pub use ids::InvocationId;
/// Validated flow name used in logs and errors.
pub use name::FlowName;
