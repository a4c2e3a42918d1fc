//! Derived, per-fetch views over raw indexer records. Nothing here is cached
//! across fetches; every projection is rebuilt from the streams it is given.

mod claims;
mod policies;

pub use claims::{pending_claims, reconcile_claims, ClaimStatus, ClaimView};
pub use policies::{claimable_enriched, claimable_policies, enrich_policies, EnrichedPolicy};
