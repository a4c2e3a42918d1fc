//! Marketplace domain types and configuration.

mod config;
pub(crate) mod events;

pub use config::MarketConfig;
pub use events::{
    ClaimDecision, ClaimStreams, ClaimSubmitted, PolicyBought, PolicyTemplate, PolicyType,
};
