//! Portfolio snapshot handed to the HTML renderer (tripcover_report crate).

use crate::market::PolicyTemplate;
use crate::view::{ClaimView, EnrichedPolicy};
use serde::{Deserialize, Serialize};

/// Everything one render needs: the account, the marketplace catalog, and the
/// account's derived views, stamped with the fetch time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioData {
    pub account: String,
    pub generated_utc_rfc3339: String,
    pub templates: Vec<PolicyTemplate>,
    pub policies: Vec<EnrichedPolicy>,
    pub claims: Vec<ClaimView>,
}

impl PortfolioData {
    pub fn new(
        account: String,
        templates: Vec<PolicyTemplate>,
        policies: Vec<EnrichedPolicy>,
        claims: Vec<ClaimView>,
    ) -> Self {
        let generated_utc_rfc3339 = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| String::new());
        Self {
            account,
            generated_utc_rfc3339,
            templates,
            policies,
            claims,
        }
    }
}
