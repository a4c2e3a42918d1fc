//! The marketplace contract bound to a wallet session: one read and four
//! writes. Writes return a pending handle; nothing is durable until the
//! receipt arrives.

use crate::gateway::abi;
use crate::gateway::session::{GatewayError, Session};
use crate::indexer::normalize_address;
use crate::market::PolicyType;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const CONFIRM_POLL_MS: u64 = 2_000;
const CONFIRM_MAX_POLLS: u32 = 60;

/// Template fields as returned by the contract's `getPolicyTemplate`. Static
/// head of the struct only; the trailing description string is served by the
/// indexer, not decoded here.
#[derive(Clone, Debug)]
pub struct OnChainTemplate {
    pub policy_type: PolicyType,
    pub premium: u128,
    pub coverage: u128,
    pub expiration_offset_secs: u64,
    pub provider: String,
}

/// Hash of a dispatched, not yet confirmed transaction.
#[derive(Clone, Debug)]
pub struct PendingTx {
    pub tx_hash: String,
}

#[derive(Clone, Debug)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

#[derive(Deserialize)]
struct RawReceipt {
    status: Option<String>,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
}

/// Contract address + session binding. Borrow the session; one session can
/// back several gateways.
pub struct ContractGateway<'a> {
    session: &'a Session,
    address: String,
    confirm_poll_ms: u64,
    confirm_max_polls: u32,
}

impl<'a> ContractGateway<'a> {
    pub fn new(session: &'a Session, contract_address: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            session,
            address: normalize_address(contract_address)?,
            confirm_poll_ms: CONFIRM_POLL_MS,
            confirm_max_polls: CONFIRM_MAX_POLLS,
        })
    }

    pub fn contract_address(&self) -> &str {
        &self.address
    }

    /// Read the on-chain template for a policy id via `eth_call`.
    pub async fn get_policy_template(
        &self,
        policy_id: u64,
    ) -> Result<OnChainTemplate, GatewayError> {
        let mut data = abi::selector("getPolicyTemplate(uint256)").to_vec();
        data.extend_from_slice(&abi::enc_uint(u128::from(policy_id)));
        let call = serde_json::json!({
            "to": self.address,
            "data": format!("0x{}", hex::encode(&data)),
        });
        let result = self
            .session
            .rpc()
            .call("eth_call", serde_json::json!([call, "latest"]))
            .await?;
        let hex_body = result
            .as_str()
            .ok_or_else(|| GatewayError::Decode("eth_call result not a string".to_string()))?;
        let bytes = hex::decode(hex_body.trim_start_matches("0x"))
            .map_err(|e| GatewayError::Decode(format!("eth_call return: {e}")))?;
        if bytes.len() < 32 * 5 {
            return Err(GatewayError::Decode(format!(
                "template return too short: {} bytes",
                bytes.len()
            )));
        }
        let policy_type_raw = abi::dec_uint(&bytes[0..32])?;
        let premium = abi::dec_uint(&bytes[32..64])?;
        let coverage = abi::dec_uint(&bytes[64..96])?;
        let expiration = abi::dec_uint(&bytes[96..128])?;
        let provider = abi::dec_address(&bytes[128..160])?;
        Ok(OnChainTemplate {
            policy_type: PolicyType::from(u8::try_from(policy_type_raw).unwrap_or(u8::MAX)),
            premium,
            coverage,
            expiration_offset_secs: u64::try_from(expiration)
                .map_err(|_| GatewayError::Decode("expiration out of range".to_string()))?,
            provider,
        })
    }

    /// Buy a policy, paying the premium as transaction value.
    pub async fn buy_policy_from_provider(
        &self,
        policy_id: u64,
        premium_wei: u128,
    ) -> Result<PendingTx, GatewayError> {
        let mut data = abi::selector("buyPolicyFromProvider(uint256)").to_vec();
        data.extend_from_slice(&abi::enc_uint(u128::from(policy_id)));
        self.send(data, Some(premium_wei)).await
    }

    /// Submit a claim against a bought policy with a URI pointing at the
    /// evidence.
    pub async fn submit_claim(
        &self,
        policy_id: u64,
        evidence_uri: &str,
    ) -> Result<PendingTx, GatewayError> {
        let mut data = abi::selector("submitClaim(uint256,string)").to_vec();
        data.extend_from_slice(&abi::enc_uint(u128::from(policy_id)));
        // Offset of the dynamic string: past the two head words.
        data.extend_from_slice(&abi::enc_uint(64));
        data.extend_from_slice(&abi::enc_string_tail(evidence_uri));
        self.send(data, None).await
    }

    /// Approve a submitted claim (provider only).
    pub async fn approve_claim(
        &self,
        claimant: &str,
        claim_id: u64,
    ) -> Result<PendingTx, GatewayError> {
        self.decide_claim("approveClaim(address,uint256)", claimant, claim_id)
            .await
    }

    /// Reject a submitted claim (provider only).
    pub async fn reject_claim(
        &self,
        claimant: &str,
        claim_id: u64,
    ) -> Result<PendingTx, GatewayError> {
        self.decide_claim("rejectClaim(address,uint256)", claimant, claim_id)
            .await
    }

    async fn decide_claim(
        &self,
        signature: &str,
        claimant: &str,
        claim_id: u64,
    ) -> Result<PendingTx, GatewayError> {
        let mut data = abi::selector(signature).to_vec();
        data.extend_from_slice(&abi::enc_address(claimant)?);
        data.extend_from_slice(&abi::enc_uint(u128::from(claim_id)));
        self.send(data, None).await
    }

    async fn send(&self, data: Vec<u8>, value: Option<u128>) -> Result<PendingTx, GatewayError> {
        let mut tx = serde_json::json!({
            "from": self.session.account(),
            "to": self.address,
            "data": format!("0x{}", hex::encode(&data)),
        });
        if let Some(v) = value {
            tx["value"] = serde_json::Value::String(format!("0x{v:x}"));
        }
        let result = self
            .session
            .rpc()
            .call("eth_sendTransaction", serde_json::json!([tx]))
            .await?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| GatewayError::Decode("tx hash not a string".to_string()))?
            .to_string();
        info!(tx_hash = %tx_hash, "transaction dispatched");
        Ok(PendingTx { tx_hash })
    }

    /// Poll for the receipt of a pending transaction. A mined-but-reverted
    /// transaction is an error; absence within the window is a timeout, not
    /// a failure verdict.
    pub async fn wait_for_receipt(&self, pending: &PendingTx) -> Result<TxReceipt, GatewayError> {
        for _ in 0..self.confirm_max_polls {
            let result = self
                .session
                .rpc()
                .call(
                    "eth_getTransactionReceipt",
                    serde_json::json!([pending.tx_hash]),
                )
                .await?;
            if result.is_null() {
                tokio::time::sleep(Duration::from_millis(self.confirm_poll_ms)).await;
                continue;
            }
            let raw: RawReceipt = serde_json::from_value(result)
                .map_err(|e| GatewayError::Decode(format!("receipt: {e}")))?;
            if raw.status.as_deref() == Some("0x0") {
                warn!(tx_hash = %pending.tx_hash, "transaction reverted");
                return Err(GatewayError::Reverted(pending.tx_hash.clone()));
            }
            let block_number = raw
                .block_number
                .and_then(|h| u64::from_str_radix(h.trim_start_matches("0x"), 16).ok());
            info!(tx_hash = %pending.tx_hash, block = ?block_number, "transaction confirmed");
            return Ok(TxReceipt {
                tx_hash: pending.tx_hash.clone(),
                block_number,
            });
        }
        Err(GatewayError::ConfirmationTimeout(pending.tx_hash.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_decodes_status_and_block() {
        let raw: RawReceipt =
            serde_json::from_str(r#"{"status":"0x1","blockNumber":"0x1a4"}"#).unwrap();
        assert_eq!(raw.status.as_deref(), Some("0x1"));
        let block = raw
            .block_number
            .and_then(|h| u64::from_str_radix(h.trim_start_matches("0x"), 16).ok());
        assert_eq!(block, Some(420));
    }

    #[test]
    fn submit_claim_calldata_layout() {
        // Mirror the encoding performed by submit_claim.
        let mut data = abi::selector("submitClaim(uint256,string)").to_vec();
        data.extend_from_slice(&abi::enc_uint(7));
        data.extend_from_slice(&abi::enc_uint(64));
        data.extend_from_slice(&abi::enc_string_tail("uri"));
        assert_eq!(data.len(), 4 + 32 * 2 + 32 * 2);
        assert_eq!(abi::dec_uint(&data[4..36]).unwrap(), 7);
        assert_eq!(abi::dec_uint(&data[36..68]).unwrap(), 64);
        assert_eq!(abi::dec_uint(&data[68..100]).unwrap(), 3);
    }
}
