//! Wallet session: one connected account bound to a JSON-RPC endpoint.
//!
//! The session is constructed once and passed by reference to whatever needs
//! it, replacing the per-view re-initialization of the wallet binding.

use crate::gateway::abi::AbiError;
use crate::indexer::{normalize_address, NormalizeError};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// EIP-1193 user-rejection code, also used by wallet RPC daemons.
const CODE_USER_REJECTED: i64 = 4001;
const CODE_METHOD_NOT_FOUND: i64 = -32601;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),
    #[error("user declined the request")]
    UserDeclined,
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("no receipt for {0} after confirmation window")]
    ConfirmationTimeout(String),
    #[error("abi: {0}")]
    Abi(#[from] AbiError),
    #[error("address: {0}")]
    Address(#[from] NormalizeError),
    #[error("decode: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
struct RpcEnvelope {
    /// Null is a legitimate result (a receipt not yet available), so this is
    /// a plain Value, not an Option.
    #[serde(default)]
    result: serde_json::Value,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

pub(crate) struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    fn new(url: &str) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub(crate) async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        debug!(method, id, "rpc call");
        let resp = self.http.post(&self.url).json(&payload).send().await?;
        let envelope: RpcEnvelope = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        if let Some(err) = envelope.error {
            if err.code == CODE_USER_REJECTED {
                return Err(GatewayError::UserDeclined);
            }
            return Err(GatewayError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result)
    }
}

/// A connected account plus the RPC channel that can act for it.
pub struct Session {
    account: String,
    rpc: RpcClient,
}

impl Session {
    /// Connect to the wallet endpoint and take its first exposed account.
    /// Transport failure or an empty account list means no usable wallet.
    pub async fn connect(wallet_rpc_url: &str) -> Result<Self, GatewayError> {
        let rpc = RpcClient::new(wallet_rpc_url)?;
        let accounts = match rpc.call("eth_requestAccounts", serde_json::json!([])).await {
            Ok(v) => v,
            // Non-interactive wallets only expose the already-unlocked list.
            Err(GatewayError::Rpc { code, .. }) if code == CODE_METHOD_NOT_FOUND => {
                rpc.call("eth_accounts", serde_json::json!([])).await?
            }
            Err(GatewayError::Transport(e)) => {
                return Err(GatewayError::WalletUnavailable(e.to_string()));
            }
            Err(other) => return Err(other),
        };
        let first = accounts
            .as_array()
            .and_then(|a| a.first())
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                GatewayError::WalletUnavailable("wallet exposed no accounts".to_string())
            })?;
        let account = normalize_address(first)?;
        info!(account = %account, "wallet session connected");
        Ok(Self { account, rpc })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub(crate) fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}
