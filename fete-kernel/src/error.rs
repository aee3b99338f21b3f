//! Errors returned by flow invocations.

use fete_adapters::BackendError;
use fete_prompts::{Stage, TemplateError, ValidationError};
use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Result alias for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Why a flow invocation or definition failed.
///
/// Invocations are all-or-nothing: any of these means no output was produced.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Input or output did not match its schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The prompt template could not be compiled or rendered.
    #[error("prompt template error: {0}")]
    Template(#[from] TemplateError),

    /// The generation backend call failed or returned unreadable text.
    #[error("backend `{provider}/{model}` failed: {source}")]
    Backend {
        /// Provider identifier.
        provider: &'static str,
        /// Model name.
        model: String,
        /// Underlying backend error.
        #[source]
        source: BackendError,
    },

    /// The invocation state machine rejected a step.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The flow definition itself is invalid.
    #[error("invalid flow definition: {0}")]
    Definition(#[from] fete_primitives::Error),
}

impl FlowError {
    /// Returns `true` when the caller's input was rejected, i.e. the caller can
    /// fix the problem by correcting the submitted fields.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Validation(err) if err.stage() == Stage::Input)
    }

    /// Returns the validation error, if this is one.
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the backend error, if this is one.
    #[must_use]
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Self::Backend { source, .. } => Some(source),
            _ => None,
        }
    }
}
