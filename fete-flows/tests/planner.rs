mod support;

use std::time::Duration;

use fete_flows::{DecorationRequest, EventType, PartyPlanner, VendorRequest};
use fete_kernel::{CollectingObserver, FlowState};
use futures::future::join_all;
use serde_json::json;
use support::RecordingBackend;

#[tokio::test]
async fn planner_routes_each_operation_to_its_flow() {
    let backend = RecordingBackend::replying_json(&json!({
        "decorationIdeas": "Streamers",
        "vendorRecommendations": ["Party Rentals Inc: tables and chairs"],
    }));
    let planner = PartyPlanner::new(backend.clone()).unwrap();
    assert_eq!(planner.backend().to_string(), "recording/stub-1");

    let ideas = planner
        .generate_decoration_ideas(&DecorationRequest::new("Circus", "Red, white", "Gym"))
        .await
        .unwrap();
    let vendors = planner
        .get_vendor_recommendations(&VendorRequest::new(EventType::Corporate, 12000.0, "Office"))
        .await
        .unwrap();

    assert_eq!(ideas.decoration_ideas, "Streamers");
    assert_eq!(vendors.vendor_recommendations.len(), 1);

    let prompts = backend.prompts();
    assert!(prompts[0].contains("decoration ideas"));
    assert!(prompts[1].contains("Budget: 12000 USD"));
}

#[tokio::test]
async fn concurrent_invocations_are_independent() {
    let backend = RecordingBackend::slow(
        json!({ "decorationIdeas": "Candles" }).to_string(),
        Duration::from_millis(20),
    );
    let observer = CollectingObserver::new();
    let planner = PartyPlanner::new(backend.clone())
        .unwrap()
        .with_observer(observer.clone());

    let requests: Vec<DecorationRequest> = (0..8)
        .map(|index| DecorationRequest::new(format!("Theme {index}"), "Blue", "Hall"))
        .collect();
    let results = join_all(
        requests
            .iter()
            .map(|request| planner.generate_decoration_ideas(request)),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(backend.calls(), 8);

    let transitions = observer.drain();
    let done: Vec<_> = transitions
        .iter()
        .filter(|transition| transition.to == FlowState::Done)
        .collect();
    assert_eq!(done.len(), 8);
    for transition in done {
        assert_eq!(transition.flow.as_str(), "generate-decoration-ideas");
    }
}

#[tokio::test]
async fn dropping_a_run_cancels_it() {
    let backend = RecordingBackend::slow(
        json!({ "decorationIdeas": "Never seen" }).to_string(),
        Duration::from_secs(30),
    );
    let planner = PartyPlanner::new(backend.clone()).unwrap();
    let request = DecorationRequest::new("Space", "Black, silver", "Planetarium");

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        planner.generate_decoration_ideas(&request),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(backend.calls(), 1);
}
