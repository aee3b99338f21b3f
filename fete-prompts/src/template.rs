//! Prompt templates with named `{{field}}` slots.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Number, Value};

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while compiling or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The render source did not supply a value for a slot.
    #[error("missing required variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// The template references a field the bound input type does not declare.
    #[error("template references unknown field `{name}`")]
    UnknownField {
        /// Name of the undeclared field.
        name: String,
    },

    /// The template text could not be parsed.
    #[error("malformed template at byte {position}: {reason}")]
    Malformed {
        /// Byte offset of the offending placeholder.
        position: usize,
        /// Reason for the failure.
        reason: String,
    },
}

/// Supplies textual values for template slots.
pub trait TemplateSource {
    /// Returns the text substituted for `name`, if available.
    fn lookup(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl TemplateSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|value| Cow::Borrowed(value.as_str()))
    }
}

impl TemplateSource for Map<String, Value> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, str>> {
        match self.get(name)? {
            Value::Null => None,
            Value::String(text) => Some(Cow::Borrowed(text.as_str())),
            Value::Array(items) => Some(Cow::Owned(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
            Value::Number(number) => Some(Cow::Owned(number_text(number))),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

// Whole floats render without a trailing `.0` so `5000.0` reads as `5000`.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(value) if number.is_f64() && value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", value as i64)
        }
        _ => number.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// A parsed prompt template.
///
/// Templates are plain text with `{{name}}` placeholders. Substitution is
/// verbatim: values are never escaped and newlines survive untouched.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use fete_prompts::template::PromptTemplate;
///
/// let template = PromptTemplate::compile("Theme: {{theme}}", &["theme"]).unwrap();
///
/// let mut values = HashMap::new();
/// values.insert("theme".to_owned(), "Under the sea".to_owned());
///
/// assert_eq!(template.render(&values).unwrap(), "Theme: Under the sea");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    slots: Vec<String>,
}

impl PromptTemplate {
    /// Parses template text without restricting which slots it may use.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Malformed`] for unterminated or empty placeholders.
    pub fn parse(source: impl Into<String>) -> TemplateResult<Self> {
        let source = source.into();
        let segments = parse_segments(&source)?;

        let mut slots: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Slot(name) = segment {
                if !slots.contains(name) {
                    slots.push(name.clone());
                }
            }
        }

        Ok(Self {
            source,
            segments,
            slots,
        })
    }

    /// Parses template text and checks every slot against the declared fields.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Malformed`] when parsing fails and
    /// [`TemplateError::UnknownField`] for the first slot not present in `fields`.
    pub fn compile(source: impl Into<String>, fields: &[&str]) -> TemplateResult<Self> {
        let template = Self::parse(source)?;
        if let Some(unknown) = template
            .slots
            .iter()
            .find(|slot| !fields.contains(&slot.as_str()))
        {
            return Err(TemplateError::UnknownField {
                name: unknown.clone(),
            });
        }
        Ok(template)
    }

    /// Renders the template against the supplied values.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] if `values` cannot supply a slot.
    pub fn render<S>(&self, values: &S) -> TemplateResult<String>
    where
        S: TemplateSource + ?Sized,
    {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Slot(name) => {
                    let value =
                        values
                            .lookup(name)
                            .ok_or_else(|| TemplateError::MissingVariable {
                                name: name.clone(),
                            })?;
                    rendered.push_str(&value);
                }
            }
        }
        Ok(rendered)
    }

    /// Returns slot names in order of first appearance.
    #[must_use]
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_segments(source: &str) -> TemplateResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = source[cursor..].find("{{") {
        let open = cursor + offset;
        if open > cursor {
            segments.push(Segment::Literal(source[cursor..open].to_owned()));
        }

        let body_start = open + 2;
        let Some(close_offset) = source[body_start..].find("}}") else {
            return Err(TemplateError::Malformed {
                position: open,
                reason: "unterminated placeholder".to_owned(),
            });
        };
        let body_end = body_start + close_offset;
        let name = source[body_start..body_end].trim();

        if name.is_empty() {
            return Err(TemplateError::Malformed {
                position: open,
                reason: "placeholder has no name".to_owned(),
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(TemplateError::Malformed {
                position: open,
                reason: format!("invalid placeholder name `{name}`"),
            });
        }

        segments.push(Segment::Slot(name.to_owned()));
        cursor = body_end + 2;
    }

    if cursor < source.len() {
        segments.push(Segment::Literal(source[cursor..].to_owned()));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn renders_simple_template() {
        let template = PromptTemplate::parse("Hello {{name}}!").unwrap();
        let rendered = template.render(&values(&[("name", "World")])).unwrap();
        assert_eq!(rendered, "Hello World!");
    }

    #[test]
    fn tolerates_whitespace_inside_braces() {
        let template = PromptTemplate::parse("Hi {{ name }}").unwrap();
        assert_eq!(template.slots(), &["name".to_owned()]);
        assert_eq!(
            template.render(&values(&[("name", "Ada")])).unwrap(),
            "Hi Ada"
        );
    }

    #[test]
    fn preserves_newlines_and_special_characters() {
        let template = PromptTemplate::parse("Venue:\n{{venue}}\n").unwrap();
        let venue = "Backyard <with> \"quotes\" & {{braces}}\nsecond line";
        let rendered = template.render(&values(&[("venue", venue)])).unwrap();
        assert_eq!(rendered, format!("Venue:\n{venue}\n"));
    }

    #[test]
    fn repeated_slots_listed_once() {
        let template = PromptTemplate::parse("{{a}} {{b}} {{a}}").unwrap();
        assert_eq!(template.slots(), &["a".to_owned(), "b".to_owned()]);
        assert_eq!(
            template.render(&values(&[("a", "1"), ("b", "2")])).unwrap(),
            "1 2 1"
        );
    }

    #[test]
    fn compile_rejects_unknown_fields() {
        let err = PromptTemplate::compile("{{theme}} {{budget}}", &["theme"])
            .expect_err("budget is not declared");
        assert_eq!(
            err,
            TemplateError::UnknownField {
                name: "budget".to_owned()
            }
        );
    }

    #[test]
    fn missing_value_is_reported() {
        let template = PromptTemplate::compile("{{theme}}", &["theme"]).unwrap();
        let err = template.render(&values(&[])).expect_err("should error");
        assert!(matches!(err, TemplateError::MissingVariable { name } if name == "theme"));
    }

    #[test]
    fn unterminated_placeholder_is_malformed() {
        let err = PromptTemplate::parse("Hello {{name").expect_err("unterminated");
        assert!(matches!(err, TemplateError::Malformed { position: 6, .. }));
    }

    #[test]
    fn empty_placeholder_is_malformed() {
        assert!(matches!(
            PromptTemplate::parse("{{ }}"),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn json_map_source_renders_numbers_and_lists() {
        let template = PromptTemplate::parse("{{budget}} USD for {{venue}}; {{tags}}").unwrap();
        let Value::Object(map) = json!({
            "budget": 2500,
            "venue": "Loft",
            "tags": ["a", "b"],
        }) else {
            unreachable!()
        };
        assert_eq!(template.render(&map).unwrap(), "2500 USD for Loft; a, b");
    }

    #[test]
    fn whole_floats_render_as_integers() {
        let template = PromptTemplate::parse("{{a}} {{b}}").unwrap();
        let Value::Object(map) = json!({ "a": 5000.0, "b": 12.5 }) else {
            unreachable!()
        };
        assert_eq!(template.render(&map).unwrap(), "5000 12.5");
    }

    #[test]
    fn json_null_counts_as_missing() {
        let template = PromptTemplate::parse("{{venue}}").unwrap();
        let Value::Object(map) = json!({ "venue": null }) else {
            unreachable!()
        };
        assert!(matches!(
            template.render(&map),
            Err(TemplateError::MissingVariable { .. })
        ));
    }

    #[test]
    fn rendering_is_deterministic() {
        let template = PromptTemplate::parse("{{x}}-{{y}}").unwrap();
        let vals = values(&[("x", "1"), ("y", "2")]);
        assert_eq!(template.render(&vals).unwrap(), template.render(&vals).unwrap());
    }
}
