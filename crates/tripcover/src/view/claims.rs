//! Claim reconciliation: three unordered event streams in, one status-tagged
//! record set out.

use crate::market::ClaimStreams;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    Submitted,
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub fn label(self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "Submitted",
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Rejected => "Rejected",
        }
    }
}

/// One reconciled claim. `coverage_amount` is only known when the submission
/// record was present; a decision event alone yields a partial record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimView {
    pub claim_id: u64,
    pub policy_id: u64,
    pub claimant: String,
    pub coverage_amount: Option<u128>,
    pub status: ClaimStatus,
}

/// Merge the three streams into one entry per claim id.
///
/// Streams are applied in the order submitted, approved, rejected; a later
/// stream overwrites the status of an entry already present. A claim id
/// appearing in both decision streams therefore resolves to Rejected, but the
/// claim lifecycle never produces that input, so the resolution is an
/// artifact of merge order, not a contract.
///
/// Output is sorted by claim id for stable display; callers must not read
/// anything else into the order.
pub fn reconcile_claims(streams: &ClaimStreams) -> Vec<ClaimView> {
    let mut by_id: HashMap<u64, ClaimView> = HashMap::new();

    for c in &streams.submitted {
        by_id.insert(
            c.claim_id,
            ClaimView {
                claim_id: c.claim_id,
                policy_id: c.policy_id,
                claimant: c.claimant.clone(),
                coverage_amount: c.coverage_amount,
                status: ClaimStatus::Submitted,
            },
        );
    }

    for (decisions, status) in [
        (&streams.approved, ClaimStatus::Approved),
        (&streams.rejected, ClaimStatus::Rejected),
    ] {
        for d in decisions {
            by_id
                .entry(d.claim_id)
                .and_modify(|entry| entry.status = status)
                .or_insert_with(|| ClaimView {
                    claim_id: d.claim_id,
                    policy_id: d.policy_id,
                    claimant: d.claimant.clone(),
                    coverage_amount: None,
                    status,
                });
        }
    }

    let mut out: Vec<ClaimView> = by_id.into_values().collect();
    out.sort_by_key(|c| c.claim_id);
    out
}

/// Provider mode: submissions with no decision yet, i.e. submitted minus
/// (approved ∪ rejected) by claim id.
pub fn pending_claims(streams: &ClaimStreams) -> Vec<crate::market::ClaimSubmitted> {
    let decided: HashSet<u64> = streams
        .approved
        .iter()
        .chain(streams.rejected.iter())
        .map(|d| d.claim_id)
        .collect();
    streams
        .submitted
        .iter()
        .filter(|c| !decided.contains(&c.claim_id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{ClaimDecision, ClaimSubmitted};

    fn submitted(claim_id: u64, policy_id: u64) -> ClaimSubmitted {
        ClaimSubmitted {
            id: format!("s{claim_id}"),
            policy_id,
            claim_id,
            claimant: "0xaa".to_string(),
            coverage_amount: Some(1_000),
        }
    }

    fn decision(claim_id: u64, policy_id: u64) -> ClaimDecision {
        ClaimDecision {
            id: format!("d{claim_id}"),
            policy_id,
            claim_id,
            claimant: "0xaa".to_string(),
        }
    }

    #[test]
    fn empty_streams_yield_empty_view() {
        assert!(reconcile_claims(&ClaimStreams::default()).is_empty());
        assert!(pending_claims(&ClaimStreams::default()).is_empty());
    }

    #[test]
    fn submitted_only() {
        let streams = ClaimStreams {
            submitted: vec![submitted(1, 10)],
            ..Default::default()
        };
        let out = reconcile_claims(&streams);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].claim_id, 1);
        assert_eq!(out[0].status, ClaimStatus::Submitted);
        assert_eq!(out[0].coverage_amount, Some(1_000));
    }

    #[test]
    fn approved_overrides_submitted() {
        let streams = ClaimStreams {
            submitted: vec![submitted(2, 10)],
            approved: vec![decision(2, 10)],
            ..Default::default()
        };
        let out = reconcile_claims(&streams);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, ClaimStatus::Approved);
        // Submission fields survive the status overwrite.
        assert_eq!(out[0].coverage_amount, Some(1_000));
    }

    #[test]
    fn rejected_merged_last_overrides_approved() {
        let streams = ClaimStreams {
            submitted: vec![submitted(3, 10)],
            approved: vec![decision(3, 10)],
            rejected: vec![decision(3, 10)],
        };
        let out = reconcile_claims(&streams);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, ClaimStatus::Rejected);
    }

    #[test]
    fn decision_without_submission_yields_partial_record() {
        let streams = ClaimStreams {
            rejected: vec![decision(4, 11)],
            ..Default::default()
        };
        let out = reconcile_claims(&streams);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, ClaimStatus::Rejected);
        assert!(out[0].coverage_amount.is_none());
    }

    #[test]
    fn disjoint_ids_keep_their_stream_status() {
        let streams = ClaimStreams {
            submitted: vec![submitted(1, 10)],
            approved: vec![decision(2, 11)],
            rejected: vec![decision(3, 12)],
        };
        let out = reconcile_claims(&streams);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].status, ClaimStatus::Submitted);
        assert_eq!(out[1].status, ClaimStatus::Approved);
        assert_eq!(out[2].status, ClaimStatus::Rejected);
    }

    #[test]
    fn pending_is_set_difference_by_claim_id() {
        let streams = ClaimStreams {
            submitted: vec![submitted(1, 10), submitted(2, 11), submitted(3, 12)],
            approved: vec![decision(2, 11)],
            rejected: vec![decision(3, 12)],
        };
        let pending = pending_claims(&streams);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].claim_id, 1);
    }
}
