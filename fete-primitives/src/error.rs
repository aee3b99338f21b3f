//! Shared error definitions for flow primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used by primitive constructors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided invocation identifier could not be parsed.
    #[error("invalid invocation id: {source}")]
    InvalidInvocationId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Flow name failed validation.
    #[error("invalid flow name `{name}`: {reason}")]
    InvalidFlowName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}
