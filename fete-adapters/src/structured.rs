//! Reading structured results out of model text.

use serde_json::Value;

use crate::traits::{BackendError, BackendResult};

/// Parses model text into a JSON object.
///
/// Models in JSON mode usually return a bare object, but some wrap it in a
/// Markdown code fence; both are accepted. Anything that is not a single JSON
/// object is rejected.
///
/// # Errors
///
/// Returns [`BackendError::Malformed`] when the text is empty, not JSON, or
/// not an object.
pub fn parse_structured(text: &str) -> BackendResult<Value> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(BackendError::malformed("model returned no content"));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|err| BackendError::malformed(format!("model output is not JSON: {err}")))?;

    if !value.is_object() {
        return Err(BackendError::malformed(
            "model output must be a JSON object",
        ));
    }
    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    // drop the info string, e.g. "json"
    match rest.find('\n') {
        Some(newline) => rest[newline + 1..].trim(),
        None => rest.trim(),
    }
}
