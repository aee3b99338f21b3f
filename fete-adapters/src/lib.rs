//! Generation backends used by flows.
//!
//! Each provider module implements [`traits::GenerationBackend`] on top of a
//! shared HTTPS transport. [`structured`] turns the returned text into JSON.

#![warn(missing_docs, clippy::pedantic)]

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod structured;
pub mod traits;

mod transport;

pub use structured::parse_structured;
pub use traits::{
    BackendError, BackendMetadata, BackendResult, GenerationBackend, GenerationRequest,
    OutputFormat,
};
pub use transport::DEFAULT_TIMEOUT;
