//! Party-planning flows built on the Fete kernel.
//!
//! Two flows are provided: [`decoration`] turns a theme, palette and venue into
//! decoration ideas, and [`vendor`] recommends vendors for an event type,
//! budget and venue. [`PartyPlanner`] binds both to one backend.

#![warn(missing_docs, clippy::pedantic)]

pub mod decoration;
mod planner;
pub mod vendor;

pub use decoration::{
    DECORATION_FLOW, DecorationFlow, DecorationRequest, DecorationResponse, decoration_definition,
    decoration_flow,
};
pub use planner::PartyPlanner;
pub use vendor::{
    EventType, VENDOR_FLOW, VendorFlow, VendorRequest, VendorResponse, vendor_definition,
    vendor_flow,
};
