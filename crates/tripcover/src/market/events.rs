//! Flat event records as materialized by the indexer.
//!
//! Field names mirror the indexer's camelCase schema. Numeric fields arrive as
//! JSON strings (the indexer encodes big integers that way) or plain numbers;
//! the serde helpers in `indexer::normalize` accept both.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Insurance product category, wire-encoded as the integer the contract emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyType {
    Delay,
    Cancellation,
    Accident,
    /// Unknown category; preserved rather than failing deserialization.
    Other(u8),
}

impl From<u8> for PolicyType {
    fn from(v: u8) -> Self {
        match v {
            0 => PolicyType::Delay,
            1 => PolicyType::Cancellation,
            2 => PolicyType::Accident,
            other => PolicyType::Other(other),
        }
    }
}

impl From<PolicyType> for u8 {
    fn from(v: PolicyType) -> Self {
        match v {
            PolicyType::Delay => 0,
            PolicyType::Cancellation => 1,
            PolicyType::Accident => 2,
            PolicyType::Other(other) => other,
        }
    }
}

impl PolicyType {
    pub fn label(self) -> &'static str {
        match self {
            PolicyType::Delay => "Flight Delay",
            PolicyType::Cancellation => "Flight Cancellation",
            PolicyType::Accident => "Flight Accident",
            PolicyType::Other(_) => "Unknown",
        }
    }
}

impl Serialize for PolicyType {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8((*self).into())
    }
}

impl<'de> Deserialize<'de> for PolicyType {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = crate::indexer::normalize::uint::deserialize(d)?;
        let v = u8::try_from(raw).map_err(|_| D::Error::custom("policy type out of range"))?;
        Ok(PolicyType::from(v))
    }
}

/// Provider-published insurance product. Read-only; created off-screen by the
/// contract owner. `expiration_offset_secs` is relative, not an absolute time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTemplate {
    pub id: String,
    #[serde(with = "crate::indexer::normalize::uint")]
    pub policy_id: u64,
    pub policy_type: PolicyType,
    #[serde(with = "crate::indexer::normalize::uint128")]
    pub premium: u128,
    #[serde(with = "crate::indexer::normalize::uint128")]
    pub coverage: u128,
    #[serde(rename = "expirationDate", with = "crate::indexer::normalize::uint")]
    pub expiration_offset_secs: u64,
    pub provider: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "crate::indexer::normalize::opt_uint")]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

/// A template instance bought by one account. Superseded once a claim is
/// submitted against its policy id.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBought {
    pub id: String,
    #[serde(with = "crate::indexer::normalize::uint")]
    pub policy_id: u64,
    pub policy_type: PolicyType,
    pub buyer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSubmitted {
    pub id: String,
    #[serde(with = "crate::indexer::normalize::uint")]
    pub policy_id: u64,
    #[serde(with = "crate::indexer::normalize::uint")]
    pub claim_id: u64,
    pub claimant: String,
    #[serde(default, with = "crate::indexer::normalize::opt_uint128")]
    pub coverage_amount: Option<u128>,
}

/// Shared record shape for the approved and rejected streams (the indexer does
/// not materialize a coverage amount on decisions).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDecision {
    pub id: String,
    #[serde(with = "crate::indexer::normalize::uint")]
    pub policy_id: u64,
    #[serde(with = "crate::indexer::normalize::uint")]
    pub claim_id: u64,
    pub claimant: String,
}

/// The three claim event streams for one fetch. Unordered; reconciliation
/// keys on claim id only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClaimStreams {
    pub submitted: Vec<ClaimSubmitted>,
    pub approved: Vec<ClaimDecision>,
    pub rejected: Vec<ClaimDecision>,
}

impl ClaimStreams {
    pub fn is_empty(&self) -> bool {
        self.submitted.is_empty() && self.approved.is_empty() && self.rejected.is_empty()
    }
}
