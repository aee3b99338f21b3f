//! The party planner: both flows bound to one backend.

use std::sync::Arc;

use fete_adapters::{BackendMetadata, GenerationBackend};
use fete_kernel::{FlowObserver, FlowResult};
use tracing::instrument;

use crate::decoration::{DecorationFlow, DecorationRequest, DecorationResponse, decoration_flow};
use crate::vendor::{VendorFlow, VendorRequest, VendorResponse, vendor_flow};

/// Both planning flows bound to one backend.
///
/// Cloning is cheap; clones share the backend handle.
#[derive(Clone, Debug)]
pub struct PartyPlanner {
    decorations: DecorationFlow,
    vendors: VendorFlow,
}

impl PartyPlanner {
    /// Builds the planner over `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if either built-in flow definition is invalid.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> FlowResult<Self> {
        Ok(Self {
            decorations: decoration_flow(Arc::clone(&backend))?,
            vendors: vendor_flow(backend)?,
        })
    }

    /// Attaches `observer` to both flows.
    #[must_use]
    pub fn with_observer(self, observer: Arc<dyn FlowObserver>) -> Self {
        Self {
            decorations: self.decorations.with_observer(Arc::clone(&observer)),
            vendors: self.vendors.with_observer(observer),
        }
    }

    /// Backend both flows call.
    #[must_use]
    pub fn backend(&self) -> &BackendMetadata {
        self.decorations.metadata()
    }

    /// The decoration flow.
    #[must_use]
    pub fn decorations(&self) -> &DecorationFlow {
        &self.decorations
    }

    /// The vendor flow.
    #[must_use]
    pub fn vendors(&self) -> &VendorFlow {
        &self.vendors
    }

    /// Generates decoration ideas.
    ///
    /// # Errors
    ///
    /// Propagates any [`FlowError`](fete_kernel::FlowError) from the decoration flow.
    #[instrument(skip_all)]
    pub async fn generate_decoration_ideas(
        &self,
        request: &DecorationRequest,
    ) -> FlowResult<DecorationResponse> {
        self.decorations.run(request).await
    }

    /// Recommends vendors.
    ///
    /// # Errors
    ///
    /// Propagates any [`FlowError`](fete_kernel::FlowError) from the vendor flow.
    #[instrument(skip_all, fields(event_type = %request.event_type))]
    pub async fn get_vendor_recommendations(
        &self,
        request: &VendorRequest,
    ) -> FlowResult<VendorResponse> {
        self.vendors.run(request).await
    }
}
