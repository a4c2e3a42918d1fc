//! Static HTML rendering of a portfolio snapshot. Embeds the full snapshot
//! JSON so the page is self-describing.

use std::io::Write;
use std::path::Path;
use tripcover::view::ClaimStatus;
use tripcover::PortfolioData;

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "io: {e}"),
            ReportError::Json(e) => write!(f, "json: {e}"),
        }
    }
}

impl std::error::Error for ReportError {}

/// Render a static HTML portfolio page to `out_path`.
pub fn render_portfolio(data: &PortfolioData, out_path: impl AsRef<Path>) -> Result<(), ReportError> {
    let html = build_html(data)?;
    let mut f = std::fs::File::create(out_path.as_ref()).map_err(ReportError::Io)?;
    f.write_all(html.as_bytes()).map_err(ReportError::Io)?;
    Ok(())
}

/// Build the HTML string (for testing or in-memory use).
pub fn build_html(data: &PortfolioData) -> Result<String, ReportError> {
    let json_embed = serde_json::to_string(data).map_err(ReportError::Json)?;
    let json_escaped = escape_json_in_html(&json_embed);
    let account = escape_html(&data.account);
    let generated = escape_html(&data.generated_utc_rfc3339);

    let mut templates = String::new();
    for t in &data.templates {
        templates.push_str(&format!(
            "<div class=\"card\"><div class=\"grid\">\
             <span class=\"label\">Policy</span><span>#{} — {}</span>\
             <span class=\"label\">Premium</span><span>{} wei</span>\
             <span class=\"label\">Coverage</span><span>{} wei</span>\
             <span class=\"label\">Window</span><span>{} s</span>\
             <span class=\"label\">Provider</span><span class=\"mono\">{}</span>\
             </div></div>\n",
            t.policy_id,
            escape_html(t.policy_type.label()),
            t.premium,
            t.coverage,
            t.expiration_offset_secs,
            escape_html(&t.provider),
        ));
    }

    let mut policies = String::new();
    for p in &data.policies {
        let coverage = p
            .coverage
            .map(|c| format!("{c} wei"))
            .unwrap_or_else(|| "—".to_string());
        let expires = p
            .expires_at
            .and_then(|e| e.format(&time::format_description::well_known::Rfc3339).ok())
            .unwrap_or_else(|| "—".to_string());
        policies.push_str(&format!(
            "<div class=\"card\"><div class=\"grid\">\
             <span class=\"label\">Policy</span><span>#{} — {}</span>\
             <span class=\"label\">Coverage</span><span>{}</span>\
             <span class=\"label\">Expires</span><span>{}</span>\
             </div></div>\n",
            p.policy_id,
            escape_html(p.policy_type.label()),
            escape_html(&coverage),
            escape_html(&expires),
        ));
    }

    let mut claims = String::new();
    for c in &data.claims {
        let amount = c
            .coverage_amount
            .map(|a| format!("{a} wei"))
            .unwrap_or_else(|| "—".to_string());
        let css = match c.status {
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        };
        claims.push_str(&format!(
            "<div class=\"card\"><div class=\"grid\">\
             <span class=\"label\">Claim</span><span>#{} (policy #{})</span>\
             <span class=\"label\">Amount</span><span>{}</span>\
             <span class=\"label\">Status</span><span class=\"{}\">{}</span>\
             </div></div>\n",
            c.claim_id,
            c.policy_id,
            escape_html(&amount),
            css,
            c.status.label(),
        ));
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Travel Cover – {account}</title>
<style>
:root {{ font-family: system-ui, sans-serif; background: #0f1419; color: #e6edf3; }}
body {{ max-width: 720px; margin: 0 auto; padding: 1.5rem; }}
h1 {{ font-size: 1.4rem; margin-bottom: 0.5rem; }}
h2 {{ font-size: 1.1rem; margin-top: 1.5rem; color: #8b949e; }}
.mono {{ font-family: ui-monospace, monospace; font-size: 0.9em; word-break: break-all; }}
.card {{ background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem; margin: 0.5rem 0; }}
.grid {{ display: grid; grid-template-columns: auto 1fr; gap: 0.25rem 1rem; }}
.label {{ color: #8b949e; }}
.submitted {{ color: #d29922; }}
.approved {{ color: #3fb950; }}
.rejected {{ color: #f85149; }}
.footer {{ margin-top: 2rem; font-size: 0.85rem; color: #8b949e; }}
</style>
</head>
<body>
<h1>Travel Cover Portfolio</h1>
<p class="mono">{account}</p>
<p>Generated: {generated}</p>

<h2>Marketplace templates ({n_templates})</h2>
{templates}

<h2>Active policies ({n_policies})</h2>
{policies}

<h2>Claims ({n_claims})</h2>
{claims}

<p class="footer">Data from the event indexer; it may lag the chain by a short delay.</p>
<script type="application/json" id="portfolio-data">{json_escaped}</script>
</body>
</html>
"#,
        account = account,
        generated = generated,
        n_templates = data.templates.len(),
        n_policies = data.policies.len(),
        n_claims = data.claims.len(),
        templates = templates,
        policies = policies,
        claims = claims,
        json_escaped = json_escaped,
    );
    Ok(html)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Inside a <script> block only `</` can break out; escape the slash.
fn escape_json_in_html(s: &str) -> String {
    s.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PortfolioData {
        PortfolioData::new(
            "0x00000000000000000000000000000000000000aa".to_string(),
            vec![],
            vec![],
            vec![],
        )
    }

    #[test]
    fn html_contains_account_and_sections() {
        let html = build_html(&sample()).unwrap();
        assert!(html.contains("0x00000000000000000000000000000000000000aa"));
        assert!(html.contains("Marketplace templates (0)"));
        assert!(html.contains("Claims (0)"));
        assert!(html.contains("portfolio-data"));
    }

    #[test]
    fn html_escapes_markup() {
        let mut data = sample();
        data.account = "<script>alert(1)</script>".to_string();
        let html = build_html(&data).unwrap();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn embedded_json_parses_back() {
        let html = build_html(&sample()).unwrap();
        let start = html.find("id=\"portfolio-data\">").unwrap() + "id=\"portfolio-data\">".len();
        let end = html[start..].find("</script>").unwrap() + start;
        let parsed: serde_json::Value =
            serde_json::from_str(&html[start..end].replace("<\\/", "</")).unwrap();
        assert!(parsed.get("account").is_some());
    }
}
