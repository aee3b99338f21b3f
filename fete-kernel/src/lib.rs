//! Flow orchestration for structured generation.
//!
//! A [`Flow`] turns a typed request into a typed response in one pass: the
//! request is checked against its schema, rendered into a prompt, sent to a
//! [`GenerationBackend`](fete_adapters::GenerationBackend) exactly once, and the
//! reply is parsed and checked against the response schema. Every invocation is
//! tracked by a [`Lifecycle`] and may be watched through a [`FlowObserver`].

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod flow;
mod lifecycle;
mod observer;

pub use error::{FlowError, FlowResult};
pub use flow::{Flow, FlowDefinition};
pub use lifecycle::{FlowEvent, FlowState, Lifecycle, LifecycleError, LifecycleResult};
pub use observer::{CollectingObserver, FlowObserver, TracingFlowObserver, Transition};
