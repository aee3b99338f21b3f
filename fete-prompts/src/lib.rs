//! Schema validation and prompt rendering for generation flows.
//!
//! [`schema`] checks request and response shapes; [`template`] turns a
//! validated request into the prompt text sent to a backend.

#![warn(missing_docs, clippy::pedantic)]

pub mod schema;
pub mod template;

pub use schema::{
    FieldKind, FieldSpec, FieldViolation, Schema, Schematic, Stage, Validated, ValidationError,
    Violation, validate_input, validate_output, validate_value,
};
pub use template::{PromptTemplate, TemplateError, TemplateResult, TemplateSource};
