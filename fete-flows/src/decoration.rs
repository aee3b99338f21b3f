//! Decoration ideas for a party theme, palette and venue.

use std::sync::{Arc, LazyLock};

use fete_adapters::GenerationBackend;
use fete_kernel::{Flow, FlowDefinition, FlowResult};
use fete_prompts::{FieldKind, FieldSpec, Schema, Schematic};
use serde::{Deserialize, Serialize};

/// Name under which the decoration flow logs and reports.
pub const DECORATION_FLOW: &str = "generate-decoration-ideas";

const DECORATION_PROMPT: &str = "\
You are an AI assistant specialized in generating decoration ideas for parties.

Based on the user's description of the desired party theme, preferred color palettes, \
and the selected venue, generate creative and practical decoration and arrangement ideas.

Theme Description: {{themeDescription}}
Color Palette: {{colorPalette}}
Venue Description: {{venueDescription}}";

/// What the host wants the party to look like.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecorationRequest {
    /// Free-text description of the desired theme.
    pub theme_description: String,
    /// Preferred colors.
    pub color_palette: String,
    /// Description of the chosen venue.
    pub venue_description: String,
}

impl DecorationRequest {
    /// Creates a request from its three descriptions.
    #[must_use]
    pub fn new(
        theme_description: impl Into<String>,
        color_palette: impl Into<String>,
        venue_description: impl Into<String>,
    ) -> Self {
        Self {
            theme_description: theme_description.into(),
            color_palette: color_palette.into(),
            venue_description: venue_description.into(),
        }
    }
}

/// Generated decoration and arrangement ideas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecorationResponse {
    /// Free-form ideas text.
    pub decoration_ideas: String,
}

static DECORATION_REQUEST: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "DecorationRequest",
        vec![
            FieldSpec::new(
                "themeDescription",
                FieldKind::Text,
                "A description of the desired party theme.",
            ),
            FieldSpec::new(
                "colorPalette",
                FieldKind::Text,
                "Preferred color palettes for the party.",
            ),
            FieldSpec::new(
                "venueDescription",
                FieldKind::Text,
                "Description of the selected venue.",
            ),
        ],
    )
});

static DECORATION_RESPONSE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "DecorationResponse",
        vec![FieldSpec::new(
            "decorationIdeas",
            FieldKind::Text,
            "AI-generated decoration and arrangement ideas.",
        )],
    )
});

impl Schematic for DecorationRequest {
    fn schema() -> &'static Schema {
        &DECORATION_REQUEST
    }
}

impl Schematic for DecorationResponse {
    fn schema() -> &'static Schema {
        &DECORATION_RESPONSE
    }
}

/// Flow producing [`DecorationResponse`] from a [`DecorationRequest`].
pub type DecorationFlow = Flow<DecorationRequest, DecorationResponse>;

/// Definition of the decoration flow, unbound from any backend.
///
/// # Errors
///
/// Returns an error only if the built-in template no longer matches the request schema.
pub fn decoration_definition() -> FlowResult<FlowDefinition<DecorationRequest, DecorationResponse>>
{
    FlowDefinition::new(DECORATION_FLOW, DECORATION_PROMPT)
}

/// Binds the decoration flow to `backend`.
///
/// # Errors
///
/// See [`decoration_definition`].
pub fn decoration_flow(backend: Arc<dyn GenerationBackend>) -> FlowResult<DecorationFlow> {
    Ok(Flow::new(decoration_definition()?, backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_uses_every_request_field() {
        let definition = decoration_definition().unwrap();
        assert_eq!(
            definition.template().slots(),
            DecorationRequest::schema().field_names()
        );
    }

    #[test]
    fn request_serializes_with_camel_case_names() {
        let request = DecorationRequest::new("Rustic barn", "Earth tones", "Old barn");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["themeDescription"], "Rustic barn");
        assert_eq!(value["colorPalette"], "Earth tones");
        assert_eq!(value["venueDescription"], "Old barn");
    }
}
