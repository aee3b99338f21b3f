//! Declarative shapes for flow inputs and outputs.
//!
//! A [`Schema`] describes the fields a JSON object must carry. Checking a
//! candidate walks every declared field in order and reports all violations,
//! so callers can surface one message per offending form field.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::template::TemplateSource;

/// Pseudo-field name used when the candidate itself is not an object.
pub const ROOT_FIELD: &str = "$";

/// Constraint applied to a single field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// String with at least one non-whitespace character.
    Text,
    /// Finite number strictly greater than zero.
    PositiveNumber,
    /// String drawn from a fixed set of values.
    Choice(&'static [&'static str]),
    /// Non-empty array of non-empty strings.
    TextList,
}

impl FieldKind {
    fn check(self, value: &Value) -> Option<Violation> {
        match self {
            Self::Text => match value.as_str() {
                None => Some(Violation::WrongType { expected: "string" }),
                Some(text) if text.trim().is_empty() => Some(Violation::Empty),
                Some(_) => None,
            },
            Self::PositiveNumber => match value.as_f64() {
                None => Some(Violation::WrongType { expected: "number" }),
                Some(number) if !number.is_finite() || number <= 0.0 => {
                    Some(Violation::NotPositive)
                }
                Some(_) => None,
            },
            Self::Choice(allowed) => match value.as_str() {
                None => Some(Violation::WrongType { expected: "string" }),
                Some(choice) if !allowed.contains(&choice) => {
                    Some(Violation::NotAllowed { allowed })
                }
                Some(_) => None,
            },
            Self::TextList => {
                let Some(items) = value.as_array() else {
                    return Some(Violation::WrongType {
                        expected: "array of strings",
                    });
                };
                if items.is_empty() {
                    return Some(Violation::EmptyList);
                }
                items.iter().enumerate().find_map(|(index, item)| {
                    match item.as_str() {
                        Some(text) if !text.trim().is_empty() => None,
                        _ => Some(Violation::EmptyItem { index }),
                    }
                })
            }
        }
    }

    fn json_schema(self, description: &str) -> Value {
        match self {
            Self::Text => json!({ "type": "string", "description": description }),
            Self::PositiveNumber => json!({
                "type": "number",
                "exclusiveMinimum": 0,
                "description": description,
            }),
            Self::Choice(allowed) => json!({
                "type": "string",
                "enum": allowed,
                "description": description,
            }),
            Self::TextList => json!({
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1,
                "description": description,
            }),
        }
    }
}

/// A named field and its constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
    description: &'static str,
}

impl FieldSpec {
    /// Declares a field.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }

    /// Wire name of the field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Constraint applied to the field.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Human-readable description, also sent to the model.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.description
    }
}

/// The declared shape of a request or response object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Creates a schema from its fields. Declaration order is the order in
    /// which violations are reported.
    #[must_use]
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { name, fields }
    }

    /// Schema name, e.g. `DecorationRequest`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Declared fields.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Wire names of the declared fields.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(FieldSpec::name).collect()
    }

    /// Checks `candidate` against every declared field.
    ///
    /// Fields not declared by the schema are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every violation in declaration order.
    pub fn check(&self, stage: Stage, candidate: &Value) -> Result<(), ValidationError> {
        let Some(object) = candidate.as_object() else {
            return Err(root_violation(
                stage,
                self,
                Violation::WrongType { expected: "object" },
            ));
        };

        let violations: Vec<FieldViolation> = self
            .fields
            .iter()
            .filter_map(|field| {
                let reason = match object.get(field.name) {
                    None | Some(Value::Null) => Some(Violation::Missing),
                    Some(value) => field.kind.check(value),
                };
                reason.map(|reason| FieldViolation::new(field.name, reason))
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(stage, self.name, violations))
        }
    }

    /// Renders the schema as a JSON Schema object.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| {
                (
                    field.name.to_owned(),
                    field.kind.json_schema(field.description),
                )
            })
            .collect();

        json!({
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": self.field_names(),
        })
    }
}

/// Which side of a flow a validation applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Caller-supplied request data.
    Input,
    /// Data produced by the generation backend.
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

/// Why a field was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    /// Field absent or null.
    #[error("is required")]
    Missing,
    /// Field present with the wrong JSON type.
    #[error("must be a {expected}")]
    WrongType {
        /// Expected JSON type.
        expected: &'static str,
    },
    /// String field blank.
    #[error("must not be empty")]
    Empty,
    /// Number zero, negative, or not finite.
    #[error("must be a positive number")]
    NotPositive,
    /// Value outside the allowed set.
    #[error("must be one of: {}", .allowed.join(", "))]
    NotAllowed {
        /// Accepted values.
        allowed: &'static [&'static str],
    },
    /// List field with no entries.
    #[error("must contain at least one entry")]
    EmptyList,
    /// List entry that is not a non-empty string.
    #[error("entry {index} must be a non-empty string")]
    EmptyItem {
        /// Zero-based position of the entry.
        index: usize,
    },
    /// Candidate passed the shape check but could not be decoded.
    #[error("could not be decoded: {detail}")]
    Undecodable {
        /// Decoder message.
        detail: String,
    },
}

/// A single rejected field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldViolation {
    field: Cow<'static, str>,
    reason: Violation,
}

impl FieldViolation {
    /// Creates a violation for `field`.
    #[must_use]
    pub fn new(field: impl Into<Cow<'static, str>>, reason: Violation) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    /// Wire name of the offending field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Why the field was rejected.
    #[must_use]
    pub fn reason(&self) -> &Violation {
        &self.reason
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.field, self.reason)
    }
}

/// A candidate failed schema conformance.
///
/// Always carries at least one [`FieldViolation`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{stage} does not match `{schema}`: {}", summarize(.violations))]
pub struct ValidationError {
    stage: Stage,
    schema: &'static str,
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    fn new(stage: Stage, schema: &'static str, violations: Vec<FieldViolation>) -> Self {
        debug_assert!(!violations.is_empty());
        Self {
            stage,
            schema,
            violations,
        }
    }

    /// Whether the input or output failed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Name of the schema that rejected the candidate.
    #[must_use]
    pub const fn schema(&self) -> &'static str {
        self.schema
    }

    /// Name of the first offending field.
    #[must_use]
    pub fn field(&self) -> &str {
        self.violations
            .first()
            .map_or(ROOT_FIELD, FieldViolation::field)
    }

    /// All violations, in declaration order.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Returns the violation reported for `field`, if any.
    #[must_use]
    pub fn violation_for(&self, field: &str) -> Option<&Violation> {
        self.violations
            .iter()
            .find(|violation| violation.field() == field)
            .map(FieldViolation::reason)
    }
}

fn root_violation(stage: Stage, schema: &Schema, reason: Violation) -> ValidationError {
    ValidationError::new(
        stage,
        schema.name(),
        vec![FieldViolation::new(ROOT_FIELD, reason)],
    )
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Types whose serialized form is governed by a [`Schema`].
pub trait Schematic: Serialize + DeserializeOwned {
    /// Returns the schema for this type.
    fn schema() -> &'static Schema;
}

/// A value that passed schema validation, together with its JSON fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Validated<T> {
    value: T,
    fields: Map<String, Value>,
}

impl<T: Schematic> Validated<T> {
    /// Validates a raw JSON candidate and decodes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the candidate violates `T::schema()` or
    /// cannot be decoded into `T`.
    pub fn from_value(stage: Stage, candidate: Value) -> Result<Self, ValidationError> {
        let schema = T::schema();
        schema.check(stage, &candidate)?;

        let fields = match candidate {
            Value::Object(fields) => fields,
            _ => {
                return Err(root_violation(
                    stage,
                    schema,
                    Violation::WrongType { expected: "object" },
                ));
            }
        };

        let value = serde_json::from_value::<T>(Value::Object(fields.clone())).map_err(|err| {
            root_violation(
                stage,
                schema,
                Violation::Undecodable {
                    detail: err.to_string(),
                },
            )
        })?;

        Ok(Self { value, fields })
    }
}

impl<T> Validated<T> {
    /// Borrows the validated value.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Returns the validated value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Returns the validated JSON fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl<T> TemplateSource for Validated<T> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, str>> {
        self.fields.lookup(name)
    }
}

/// Validates a typed request before it is dispatched.
///
/// # Errors
///
/// Returns [`ValidationError`] with [`Stage::Input`] when any field violates the schema.
pub fn validate_input<T: Schematic>(candidate: &T) -> Result<Validated<T>, ValidationError> {
    let value = serde_json::to_value(candidate).map_err(|err| {
        root_violation(
            Stage::Input,
            T::schema(),
            Violation::Undecodable {
                detail: err.to_string(),
            },
        )
    })?;
    Validated::from_value(Stage::Input, value)
}

/// Validates untyped request data, e.g. a submitted form.
///
/// # Errors
///
/// Returns [`ValidationError`] with [`Stage::Input`] when any field violates the schema.
pub fn validate_value<T: Schematic>(candidate: Value) -> Result<Validated<T>, ValidationError> {
    Validated::from_value(Stage::Input, candidate)
}

/// Validates the structured result returned by a generation backend.
///
/// # Errors
///
/// Returns [`ValidationError`] with [`Stage::Output`] when any field violates the schema.
pub fn validate_output<T: Schematic>(candidate: Value) -> Result<T, ValidationError> {
    Validated::from_value(Stage::Output, candidate).map(Validated::into_inner)
}
