//! Vendor recommendations for an event type, budget and venue.

use std::fmt;
use std::sync::{Arc, LazyLock};

use fete_adapters::GenerationBackend;
use fete_kernel::{Flow, FlowDefinition, FlowResult};
use fete_prompts::{FieldKind, FieldSpec, Schema, Schematic};
use serde::{Deserialize, Serialize};

/// Name under which the vendor flow logs and reports.
pub const VENDOR_FLOW: &str = "vendor-recommendations";

const VENDOR_PROMPT: &str = "\
You are a party planning expert. Based on the event type, budget, and venue, \
recommend suitable vendors. Provide a brief description of each vendor.

Event Type: {{eventType}}
Budget: {{budget}} USD
Venue: {{venue}}

Return vendors suitable for the event, that are within budget, and appropriate for the venue.";

const EVENT_TYPES: &[&str] = &["birthday", "wedding", "corporate", "other"];

/// Kind of event being planned.
///
/// The set is closed: callers holding a category outside these four should
/// send [`EventType::Other`], since unknown names are rejected as
/// `NotAllowed` on `eventType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Birthday party.
    Birthday,
    /// Wedding.
    Wedding,
    /// Company or team event.
    Corporate,
    /// Anything else.
    Other,
}

impl EventType {
    /// Every event type, in the order forms present them.
    pub const ALL: [Self; 4] = [Self::Birthday, Self::Wedding, Self::Corporate, Self::Other];

    /// Wire name, e.g. `wedding`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Birthday => "birthday",
            Self::Wedding => "wedding",
            Self::Corporate => "corporate",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event details used to pick vendors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRequest {
    /// Kind of event.
    pub event_type: EventType,
    /// Total budget in USD; must be positive.
    pub budget: f64,
    /// Venue name or description.
    pub venue: String,
}

impl VendorRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(event_type: EventType, budget: f64, venue: impl Into<String>) -> Self {
        Self {
            event_type,
            budget,
            venue: venue.into(),
        }
    }
}

/// Recommended vendors, each with a short description, in the backend's order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorResponse {
    /// Vendor entries.
    pub vendor_recommendations: Vec<String>,
}

static VENDOR_REQUEST: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "VendorRequest",
        vec![
            FieldSpec::new(
                "eventType",
                FieldKind::Choice(EVENT_TYPES),
                "The type of event (e.g., birthday, wedding, corporate)",
            ),
            FieldSpec::new(
                "budget",
                FieldKind::PositiveNumber,
                "The budget for the event in USD.",
            ),
            FieldSpec::new(
                "venue",
                FieldKind::Text,
                "The name or description of the venue.",
            ),
        ],
    )
});

static VENDOR_RESPONSE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "VendorResponse",
        vec![FieldSpec::new(
            "vendorRecommendations",
            FieldKind::TextList,
            "A list of recommended vendors with brief descriptions.",
        )],
    )
});

impl Schematic for VendorRequest {
    fn schema() -> &'static Schema {
        &VENDOR_REQUEST
    }
}

impl Schematic for VendorResponse {
    fn schema() -> &'static Schema {
        &VENDOR_RESPONSE
    }
}

/// Flow producing [`VendorResponse`] from a [`VendorRequest`].
pub type VendorFlow = Flow<VendorRequest, VendorResponse>;

/// Definition of the vendor flow, unbound from any backend.
///
/// # Errors
///
/// Returns an error only if the built-in template no longer matches the request schema.
pub fn vendor_definition() -> FlowResult<FlowDefinition<VendorRequest, VendorResponse>> {
    FlowDefinition::new(VENDOR_FLOW, VENDOR_PROMPT)
}

/// Binds the vendor flow to `backend`.
///
/// # Errors
///
/// See [`vendor_definition`].
pub fn vendor_flow(backend: Arc<dyn GenerationBackend>) -> FlowResult<VendorFlow> {
    Ok(Flow::new(vendor_definition()?, backend))
}
