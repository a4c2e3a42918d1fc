//! Integration tests over saved indexer-shaped fixtures.

use std::path::Path;
use time::OffsetDateTime;
use tripcover::view::{claimable_enriched, pending_claims, reconcile_claims, ClaimStatus};
use tripcover::workflow::{TxState, TxWorkflow};
use tripcover::{ClaimStreams, ClaimSubmitted, PolicyBought, PolicyTemplate, RefreshTracker};

fn load_fixture(path: &str) -> serde_json::Value {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata");
    let full = root.join(path);
    let s =
        std::fs::read_to_string(&full).unwrap_or_else(|e| panic!("read {}: {}", full.display(), e));
    serde_json::from_str(&s).unwrap_or_else(|e| panic!("parse {}: {}", path, e))
}

fn fixture_templates() -> Vec<PolicyTemplate> {
    let v = load_fixture("templates_response.json");
    serde_json::from_value(v["policyTemplateListeds"].clone()).unwrap()
}

fn fixture_streams() -> ClaimStreams {
    serde_json::from_value(load_fixture("claim_streams.json")).unwrap()
}

fn fixture_ownership() -> (Vec<PolicyBought>, Vec<ClaimSubmitted>) {
    let v = load_fixture("ownership_response.json");
    let bought = serde_json::from_value(v["policyBoughts"].clone()).unwrap();
    let submitted = serde_json::from_value(v["claimSubmitteds"].clone()).unwrap();
    (bought, submitted)
}

#[test]
fn templates_fixture_parses() {
    let templates = fixture_templates();
    assert_eq!(templates.len(), 3);
    assert_eq!(templates[0].policy_id, 0);
    assert_eq!(templates[1].premium, 20_000_000_000_000_000);
    assert_eq!(templates[2].expiration_offset_secs, 7_776_000);
    assert!(templates[0]
        .description
        .as_deref()
        .unwrap()
        .contains("Flight Delays"));
}

#[test]
fn claim_streams_reconcile_from_fixture() {
    let streams = fixture_streams();
    let claims = reconcile_claims(&streams);
    assert_eq!(claims.len(), 3);
    assert_eq!(claims[0].claim_id, 1);
    assert_eq!(claims[0].status, ClaimStatus::Submitted);
    assert_eq!(claims[1].status, ClaimStatus::Approved);
    assert_eq!(claims[2].status, ClaimStatus::Rejected);
    // The decision entries keep the submission's coverage amount.
    assert_eq!(claims[1].coverage_amount, Some(800_000_000_000_000_000));
}

#[test]
fn provider_pending_from_fixture() {
    let streams = fixture_streams();
    let pending = pending_claims(&streams);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].claim_id, 1);
}

#[test]
fn ownership_fixture_claimable_view() {
    let (bought, submitted) = fixture_ownership();
    let templates = fixture_templates();
    let now = OffsetDateTime::from_unix_timestamp(1_716_720_000).unwrap();
    let policies = claimable_enriched(&bought, &submitted, &templates, now);
    // Policy 5 has a submitted claim; only policy 6 remains.
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].policy_id, 6);
    assert_eq!(policies[0].premium, Some(20_000_000_000_000_000));
    assert_eq!(
        policies[0].expires_at,
        Some(now + time::Duration::seconds(5_184_000))
    );
    assert!(!policies[0].is_expired(now));
}

#[test]
fn empty_claims_leave_purchases_unfiltered() {
    let (bought, _) = fixture_ownership();
    let templates = fixture_templates();
    let now = OffsetDateTime::from_unix_timestamp(1_716_720_000).unwrap();
    let policies = claimable_enriched(&bought, &[], &templates, now);
    assert_eq!(policies.len(), bought.len());
}

#[test]
fn failed_buy_never_confirms() {
    let mut workflow = TxWorkflow::new();
    workflow.begin().unwrap();
    workflow.fail("buy policy: user declined the request");
    match workflow.state() {
        TxState::Failed { reason } => {
            assert!(reason.contains("user declined"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(!workflow.needs_refresh());
    // Manual retry path: reset then a fresh dispatch is accepted.
    workflow.reset();
    assert!(workflow.begin().is_ok());
}

#[test]
fn stale_fetch_is_discarded() {
    let tracker = RefreshTracker::new();
    let first = tracker.begin();
    let second = tracker.begin();
    assert!(!tracker.accept(first), "superseded fetch must be dropped");
    assert!(tracker.accept(second));
}

#[test]
fn views_are_rebuilt_not_cached() {
    // Re-running reconciliation over the same streams is pure.
    let streams = fixture_streams();
    let a = reconcile_claims(&streams);
    let b = reconcile_claims(&streams);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.claim_id, y.claim_id);
        assert_eq!(x.status, y.status);
    }
}
