//! tripcover — client engine for an on-chain travel-insurance marketplace.
//!
//! Reads policy and claim events from an external GraphQL indexer, reconciles
//! them into per-account views, and drives contract writes (buy, claim,
//! approve, reject) through a wallet-held JSON-RPC endpoint. Keys never touch
//! this crate; signing stays in the wallet.

pub mod gateway;
pub mod indexer;
pub mod market;
pub mod report;
pub mod view;
pub mod workflow;

pub use gateway::{ContractGateway, GatewayError, OnChainTemplate, PendingTx, Session, TxReceipt};
pub use indexer::{IndexerClient, QueryCache, QueryConfig, QueryError};
pub use market::{
    ClaimDecision, ClaimStreams, ClaimSubmitted, MarketConfig, PolicyBought, PolicyTemplate,
    PolicyType,
};
pub use report::PortfolioData;
pub use view::{ClaimStatus, ClaimView, EnrichedPolicy};
pub use workflow::{RefreshTracker, TxState, TxWorkflow, WriteCall};
