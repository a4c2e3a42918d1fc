//! Wallet session and contract gateway: the write path to the marketplace
//! contract through an external JSON-RPC wallet endpoint. Signing happens in
//! the wallet, never here.

pub(crate) mod abi;
mod contract;
mod session;

pub use abi::AbiError;
pub use contract::{ContractGateway, OnChainTemplate, PendingTx, TxReceipt};
pub use session::{GatewayError, Session};
