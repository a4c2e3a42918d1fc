//! GraphQL client for the event indexer, with rate limiting, retries, and an
//! optional SQLite response cache.
//!
//! The indexer is eventually consistent: a query issued right after a
//! confirmed transaction may still answer from a pre-transaction view.

use crate::indexer::cache::QueryCache;
use crate::indexer::normalize::{normalize_address, NormalizeError};
use crate::market::{ClaimDecision, ClaimStreams, ClaimSubmitted, PolicyBought, PolicyTemplate};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

const RATE_LIMIT_MS: u64 = 200;
const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;

#[derive(Clone, Debug)]
pub struct QueryConfig {
    pub endpoint: String,
    pub rate_limit_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub offline: bool,
}

impl QueryConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            rate_limit_ms: RATE_LIMIT_MS,
            max_retries: MAX_RETRIES,
            retry_backoff_ms: RETRY_BACKOFF_MS,
            offline: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("request: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cache: {0}")]
    Cache(#[from] crate::indexer::cache::CacheError),
    #[error("normalize: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("indexer error: status {0} body {1}")]
    Api(u16, String),
    #[error("graphql: {0}")]
    GraphQl(String),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("offline mode: no cached data for query")]
    OfflineMiss,
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct TemplatesData {
    #[serde(rename = "policyTemplateListeds")]
    templates: Vec<PolicyTemplate>,
}

#[derive(Deserialize)]
struct ClaimsData {
    #[serde(rename = "claimSubmitteds")]
    submitted: Vec<ClaimSubmitted>,
    #[serde(rename = "claimApproveds")]
    approved: Vec<ClaimDecision>,
    #[serde(rename = "claimRejecteds")]
    rejected: Vec<ClaimDecision>,
}

#[derive(Deserialize)]
struct OwnershipData {
    #[serde(rename = "policyBoughts")]
    bought: Vec<PolicyBought>,
    #[serde(rename = "claimSubmitteds")]
    submitted: Vec<ClaimSubmitted>,
}

fn templates_query() -> String {
    "{ policyTemplateListeds(orderBy: id) { id policyId policyType premium coverage \
     expirationDate provider description timestamp transactionHash } }"
        .to_string()
}

/// Claims query; `claimant` of None returns every account's claims
/// (provider mode).
fn claims_query(claimant: Option<&str>) -> String {
    let filter = claimant
        .map(|a| format!("(where: {{ claimant: \"{a}\" }})"))
        .unwrap_or_default();
    format!(
        "{{ claimSubmitteds{filter} {{ id policyId claimId claimant coverageAmount }} \
         claimApproveds{filter} {{ id policyId claimId claimant }} \
         claimRejecteds{filter} {{ id policyId claimId claimant }} }}"
    )
}

/// Purchases for one buyer plus every submitted claim; the ownership
/// view-model filters bought policies against all claims, not just the
/// buyer's own.
fn ownership_query(buyer: &str) -> String {
    format!(
        "{{ policyBoughts(where: {{ buyer: \"{buyer}\" }}) {{ id policyId policyType buyer }} \
         claimSubmitteds {{ id policyId claimId claimant }} }}"
    )
}

/// Read-only client for the indexer. One instance per process is enough; it
/// is internally synchronized.
pub struct IndexerClient {
    config: QueryConfig,
    client: Option<reqwest::Client>,
    cache: Option<QueryCache>,
    last_request: std::sync::Mutex<Option<OffsetDateTime>>,
    request_count: AtomicU64,
}

impl IndexerClient {
    pub fn new(config: QueryConfig, cache: Option<QueryCache>) -> Result<Self, QueryError> {
        let client = if config.offline {
            None
        } else {
            Some(
                reqwest::Client::builder()
                    .use_rustls_tls()
                    .timeout(Duration::from_secs(30))
                    .build()?,
            )
        };
        Ok(Self {
            config,
            client,
            cache,
            last_request: std::sync::Mutex::new(None),
            request_count: AtomicU64::new(0),
        })
    }

    async fn rate_limit(&self) {
        let sleep_ms = {
            let prev = *self.last_request.lock().unwrap();
            if let Some(prev) = prev {
                let elapsed = (OffsetDateTime::now_utc() - prev).whole_milliseconds();
                let need: i128 = self.config.rate_limit_ms as i128;
                if elapsed < need {
                    (need - elapsed).max(0) as u64
                } else {
                    0
                }
            } else {
                0
            }
        };
        if sleep_ms > 0 {
            tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
        }
        *self.last_request.lock().unwrap() = Some(OffsetDateTime::now_utc());
    }

    /// POST a GraphQL document and return the `data` object. Retries
    /// transport and HTTP-level failures with backoff; GraphQL-level errors
    /// are not retried.
    async fn post_query(&self, query: &str) -> Result<serde_json::Value, QueryError> {
        let norm = serde_json::json!({ "endpoint": self.config.endpoint, "query": query });
        let cache_key = QueryCache::key_for(&norm.to_string());

        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(&cache_key)? {
                debug!(key = %cache_key, "cache hit");
                return unwrap_envelope(&body);
            }
            if self.config.offline {
                return Err(QueryError::OfflineMiss);
            }
        }

        let client = self.client.as_ref().ok_or(QueryError::OfflineMiss)?;
        self.rate_limit().await;

        let payload = serde_json::json!({ "query": query });
        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            match client.post(&self.config.endpoint).json(&payload).send().await {
                Ok(r) => {
                    let status = r.status();
                    let body = r.text().await.unwrap_or_default();
                    if !status.is_success() {
                        last_err = Some(QueryError::Api(status.as_u16(), body));
                        if attempt < self.config.max_retries {
                            let ms = self.config.retry_backoff_ms * (1 << attempt);
                            tokio::time::sleep(Duration::from_millis(ms)).await;
                        }
                        continue;
                    }
                    self.request_count.fetch_add(1, Ordering::Relaxed);
                    let data = unwrap_envelope(&body)?;
                    if let Some(cache) = &self.cache {
                        let _ = cache.set(&cache_key, &body);
                    }
                    return Ok(data);
                }
                Err(e) => {
                    last_err = Some(QueryError::Transport(e));
                    if attempt < self.config.max_retries {
                        let ms = self.config.retry_backoff_ms * (1 << attempt);
                        warn!(attempt, ms, "retry after transport error");
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or(QueryError::Api(0, "unknown".to_string())))
    }

    /// All published policy templates.
    pub async fn templates(&self) -> Result<Vec<PolicyTemplate>, QueryError> {
        let data = self.post_query(&templates_query()).await?;
        let parsed: TemplatesData = serde_json::from_value(data)?;
        info!(count = parsed.templates.len(), "templates");
        Ok(parsed.templates)
    }

    /// The three claim streams for one claimant.
    pub async fn claims_for(&self, claimant: &str) -> Result<ClaimStreams, QueryError> {
        let claimant = normalize_address(claimant)?;
        self.fetch_claim_streams(Some(&claimant)).await
    }

    /// The three claim streams across all accounts (provider mode).
    pub async fn all_claim_streams(&self) -> Result<ClaimStreams, QueryError> {
        self.fetch_claim_streams(None).await
    }

    async fn fetch_claim_streams(
        &self,
        claimant: Option<&str>,
    ) -> Result<ClaimStreams, QueryError> {
        let data = self.post_query(&claims_query(claimant)).await?;
        let parsed: ClaimsData = serde_json::from_value(data)?;
        info!(
            submitted = parsed.submitted.len(),
            approved = parsed.approved.len(),
            rejected = parsed.rejected.len(),
            "claim streams"
        );
        Ok(ClaimStreams {
            submitted: parsed.submitted,
            approved: parsed.approved,
            rejected: parsed.rejected,
        })
    }

    /// Purchases for `buyer` together with all submitted claims (the inputs
    /// of the policy ownership view-model).
    pub async fn bought_and_submitted(
        &self,
        buyer: &str,
    ) -> Result<(Vec<PolicyBought>, Vec<ClaimSubmitted>), QueryError> {
        let buyer = normalize_address(buyer)?;
        let data = self.post_query(&ownership_query(&buyer)).await?;
        let parsed: OwnershipData = serde_json::from_value(data)?;
        info!(
            bought = parsed.bought.len(),
            submitted = parsed.submitted.len(),
            "ownership streams"
        );
        Ok((parsed.bought, parsed.submitted))
    }

    /// Drop every cached response. Called after a confirmed transaction so
    /// the follow-up refresh reaches the indexer instead of the cache.
    pub fn purge_cache(&self) -> Result<(), QueryError> {
        if let Some(cache) = &self.cache {
            cache.evict_older_than(-1)?;
        }
        Ok(())
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

fn unwrap_envelope(body: &str) -> Result<serde_json::Value, QueryError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if !envelope.errors.is_empty() {
        let joined = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(QueryError::GraphQl(joined));
    }
    envelope
        .data
        .ok_or_else(|| QueryError::GraphQl("response had no data".to_string()))
}
