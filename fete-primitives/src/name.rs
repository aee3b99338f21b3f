//! Flow naming.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_NAME_LEN: usize = 64;

/// Name identifying a flow, e.g. `generate-decoration-ideas`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlowName(String);

impl FlowName {
    /// Creates a new flow name after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFlowName`] if the name is empty, too long, or
    /// contains characters other than lowercase alphanumerics, dash, underscore,
    /// or dot.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FlowName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FlowName> for String {
    fn from(value: FlowName) -> Self {
        value.0
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidFlowName {
            name: String::new(),
            reason: "name cannot be empty".into(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidFlowName {
            name: name.into(),
            reason: format!("name length must be <= {MAX_NAME_LEN}"),
        });
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.'))
    {
        return Err(Error::InvalidFlowName {
            name: name.into(),
            reason: "name must contain lowercase alphanumeric, dash, underscore, or dot".into(),
        });
    }

    Ok(())
}
