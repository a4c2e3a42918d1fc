//! Policy ownership: which purchases are still claimable, enriched with the
//! template they were bought from.

use crate::market::{ClaimSubmitted, PolicyBought, PolicyTemplate, PolicyType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use time::OffsetDateTime;

/// A purchase joined with its template at read time. Enrichment fields are
/// None when no template matches the policy type; a partial record renders,
/// a failed join does not abort the view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrichedPolicy {
    pub id: String,
    pub policy_id: u64,
    pub policy_type: PolicyType,
    pub buyer: String,
    #[serde(default, with = "crate::indexer::normalize::opt_uint128")]
    pub premium: Option<u128>,
    #[serde(default, with = "crate::indexer::normalize::opt_uint128")]
    pub coverage: Option<u128>,
    pub provider: Option<String>,
    pub description: Option<String>,
    /// Query time + the template's expiration offset. Relative to fetch, not
    /// to purchase; see the expiration note on `enrich_policies`.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl EnrichedPolicy {
    /// Whether the policy window has passed. An unknown expiry (missing
    /// template) does not count as expired.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|e| now > e)
    }
}

/// Purchases with no submitted claim against their policy id. Any claim
/// supersedes the purchase, whoever submitted it.
pub fn claimable_policies(
    bought: &[PolicyBought],
    submitted: &[ClaimSubmitted],
) -> Vec<PolicyBought> {
    let claimed: HashSet<u64> = submitted.iter().map(|c| c.policy_id).collect();
    bought
        .iter()
        .filter(|p| !claimed.contains(&p.policy_id))
        .cloned()
        .collect()
}

/// Join purchases with templates by policy type.
///
/// Template fields are resolved at read time, never cached from purchase
/// time, so a re-published template is reflected on the next fetch. The
/// computed expiry is `now` + offset — relative to this query, which
/// overstates the window for policies bought earlier. Kept as-is until the
/// contract exposes an absolute expiry.
pub fn enrich_policies(
    bought: &[PolicyBought],
    templates: &[PolicyTemplate],
    now: OffsetDateTime,
) -> Vec<EnrichedPolicy> {
    bought
        .iter()
        .map(|p| {
            let template = templates.iter().find(|t| t.policy_type == p.policy_type);
            EnrichedPolicy {
                id: p.id.clone(),
                policy_id: p.policy_id,
                policy_type: p.policy_type,
                buyer: p.buyer.clone(),
                premium: template.map(|t| t.premium),
                coverage: template.map(|t| t.coverage),
                provider: template.map(|t| t.provider.clone()),
                description: template.and_then(|t| t.description.clone()),
                expires_at: template
                    .map(|t| now + time::Duration::seconds(t.expiration_offset_secs as i64)),
            }
        })
        .collect()
}

/// The "active, unclaimed" view: filter then enrich.
pub fn claimable_enriched(
    bought: &[PolicyBought],
    submitted: &[ClaimSubmitted],
    templates: &[PolicyTemplate],
    now: OffsetDateTime,
) -> Vec<EnrichedPolicy> {
    enrich_policies(&claimable_policies(bought, submitted), templates, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bought(policy_id: u64, policy_type: PolicyType) -> PolicyBought {
        PolicyBought {
            id: format!("b{policy_id}"),
            policy_id,
            policy_type,
            buyer: "0xaa".to_string(),
        }
    }

    fn submitted(policy_id: u64) -> ClaimSubmitted {
        ClaimSubmitted {
            id: format!("s{policy_id}"),
            policy_id,
            claim_id: policy_id * 100,
            claimant: "0xbb".to_string(),
            coverage_amount: None,
        }
    }

    fn template(policy_type: PolicyType, offset_secs: u64) -> PolicyTemplate {
        PolicyTemplate {
            id: "t1".to_string(),
            policy_id: 1,
            policy_type,
            premium: 5_000,
            coverage: 100_000,
            expiration_offset_secs: offset_secs,
            provider: "0xprovider".to_string(),
            description: Some("flight cover".to_string()),
            timestamp: None,
            transaction_hash: None,
        }
    }

    #[test]
    fn claim_excludes_policy_from_claimable() {
        let bought = vec![bought(5, PolicyType::Delay), bought(6, PolicyType::Delay)];
        let out = claimable_policies(&bought, &[submitted(5)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].policy_id, 6);
    }

    #[test]
    fn no_claims_keeps_everything() {
        let bought = vec![bought(1, PolicyType::Delay), bought(2, PolicyType::Accident)];
        assert_eq!(claimable_policies(&bought, &[]).len(), 2);
    }

    #[test]
    fn claim_by_other_account_still_supersedes() {
        // The filter keys on policy id alone; claimant identity is irrelevant.
        let out = claimable_policies(&[bought(7, PolicyType::Delay)], &[submitted(7)]);
        assert!(out.is_empty());
    }

    #[test]
    fn enrichment_joins_on_policy_type() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let out = enrich_policies(
            &[bought(3, PolicyType::Cancellation)],
            &[template(PolicyType::Cancellation, 3_600)],
            now,
        );
        assert_eq!(out[0].premium, Some(5_000));
        assert_eq!(out[0].coverage, Some(100_000));
        assert_eq!(
            out[0].expires_at,
            Some(now + time::Duration::seconds(3_600))
        );
        assert!(!out[0].is_expired(now));
        assert!(out[0].is_expired(now + time::Duration::seconds(3_601)));
    }

    #[test]
    fn missing_template_leaves_fields_absent() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let out = enrich_policies(
            &[bought(4, PolicyType::Accident)],
            &[template(PolicyType::Delay, 60)],
            now,
        );
        assert_eq!(out.len(), 1);
        assert!(out[0].premium.is_none());
        assert!(out[0].expires_at.is_none());
        assert!(!out[0].is_expired(now));
    }

    #[test]
    fn claimable_enriched_filters_then_joins() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let bought = vec![bought(5, PolicyType::Delay), bought(6, PolicyType::Delay)];
        let out = claimable_enriched(
            &bought,
            &[submitted(5)],
            &[template(PolicyType::Delay, 60)],
            now,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].policy_id, 6);
        assert_eq!(out[0].provider.as_deref(), Some("0xprovider"));
    }
}
