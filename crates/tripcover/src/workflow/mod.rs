//! Transaction workflow and view refresh sequencing.

mod refresh;
mod tx;

pub use refresh::RefreshTracker;
pub use tx::{TxState, TxWorkflow, WorkflowError};

use crate::gateway::{ContractGateway, GatewayError, PendingTx};
use tracing::info;

/// One user-initiated contract write. A workflow wraps exactly one of these.
#[derive(Clone, Debug)]
pub enum WriteCall {
    Buy { policy_id: u64, premium_wei: u128 },
    SubmitClaim { policy_id: u64, evidence_uri: String },
    ApproveClaim { claimant: String, claim_id: u64 },
    RejectClaim { claimant: String, claim_id: u64 },
}

impl WriteCall {
    pub fn label(&self) -> &'static str {
        match self {
            WriteCall::Buy { .. } => "buy policy",
            WriteCall::SubmitClaim { .. } => "submit claim",
            WriteCall::ApproveClaim { .. } => "approve claim",
            WriteCall::RejectClaim { .. } => "reject claim",
        }
    }

    async fn dispatch(&self, gateway: &ContractGateway<'_>) -> Result<PendingTx, GatewayError> {
        match self {
            WriteCall::Buy {
                policy_id,
                premium_wei,
            } => gateway.buy_policy_from_provider(*policy_id, *premium_wei).await,
            WriteCall::SubmitClaim {
                policy_id,
                evidence_uri,
            } => gateway.submit_claim(*policy_id, evidence_uri).await,
            WriteCall::ApproveClaim { claimant, claim_id } => {
                gateway.approve_claim(claimant, *claim_id).await
            }
            WriteCall::RejectClaim { claimant, claim_id } => {
                gateway.reject_claim(claimant, *claim_id).await
            }
        }
    }
}

/// Drive a write call through the workflow: dispatch, wait for the receipt,
/// land in Confirmed or Failed. Gateway failures become a Failed state with a
/// human-readable reason rather than propagating; the only hard error is an
/// attempt to dispatch while a previous call is still pending. Never retries;
/// a retry is the caller running a fresh call after `reset()`.
pub async fn run_write(
    workflow: &mut TxWorkflow,
    gateway: &ContractGateway<'_>,
    call: &WriteCall,
) -> Result<TxState, WorkflowError> {
    workflow.begin()?;
    info!(action = call.label(), "dispatching");
    let pending = match call.dispatch(gateway).await {
        Ok(p) => p,
        Err(e) => {
            workflow.fail(format!("{}: {e}", call.label()));
            return Ok(workflow.state().clone());
        }
    };
    workflow.dispatched(&pending.tx_hash);
    match gateway.wait_for_receipt(&pending).await {
        Ok(receipt) => workflow.confirm(receipt.tx_hash),
        Err(e) => workflow.fail(format!("{}: {e}", call.label())),
    }
    Ok(workflow.state().clone())
}
