//! tripcover CLI: marketplace, portfolio, and claim views plus the four
//! contract write actions.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tripcover::view::{claimable_enriched, pending_claims, reconcile_claims, ClaimStatus};
use tripcover::workflow::{run_write, TxState, TxWorkflow, WriteCall};
use tripcover::{
    ContractGateway, IndexerClient, MarketConfig, PortfolioData, QueryCache, QueryConfig,
    RefreshTracker, Session,
};
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();
    match cli.command {
        Command::Templates(args) => run_templates(args),
        Command::Policies(args) => run_policies(args),
        Command::Claims(args) => run_claims(args),
        Command::Provider(args) => run_provider(args),
        Command::Report(args) => run_report(args),
        Command::Buy(args) => run_buy(args),
        Command::SubmitClaim(args) => run_submit_claim(args),
        Command::Approve(args) => run_decide(args, true),
        Command::Reject(args) => run_decide(args, false),
    }
}

#[derive(Parser)]
#[command(name = "tripcover")]
#[command(about = "Travel-insurance marketplace client: views over the event indexer, writes through your wallet RPC")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the policy templates published on the marketplace.
    Templates(ReadArgs),
    /// Show your active, unclaimed policies.
    Policies(AccountArgs),
    /// Show your claims with their reconciled status.
    Claims(AccountArgs),
    /// Provider view: pending, approved, and rejected claims across accounts.
    Provider(ReadArgs),
    /// Write a static HTML portfolio report.
    Report(ReportArgs),
    /// Buy a policy, paying its premium from the wallet account.
    Buy(BuyArgs),
    /// Submit a claim against one of your policies.
    SubmitClaim(SubmitClaimArgs),
    /// Approve a submitted claim (provider only).
    Approve(DecideArgs),
    /// Reject a submitted claim (provider only).
    Reject(DecideArgs),
}

#[derive(Parser)]
struct ReadArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "./data/cache")]
    cache_dir: PathBuf,
    #[arg(long)]
    offline: bool,
}

#[derive(Parser)]
struct AccountArgs {
    /// Account address; defaults to the wallet's first account.
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "./data/cache")]
    cache_dir: PathBuf,
    #[arg(long)]
    offline: bool,
}

#[derive(Parser)]
struct ReportArgs {
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, default_value = "./reports")]
    reports_dir: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "./data/cache")]
    cache_dir: PathBuf,
    #[arg(long)]
    offline: bool,
}

#[derive(Parser)]
struct BuyArgs {
    #[arg(long)]
    policy_id: u64,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "./data/cache")]
    cache_dir: PathBuf,
}

#[derive(Parser)]
struct SubmitClaimArgs {
    #[arg(long)]
    policy_id: u64,
    /// URI pointing at the claim evidence.
    #[arg(long, default_value = "ipfs://unspecified")]
    evidence: String,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "./data/cache")]
    cache_dir: PathBuf,
}

#[derive(Parser)]
struct DecideArgs {
    #[arg(long)]
    claimant: String,
    #[arg(long)]
    claim_id: u64,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "./data/cache")]
    cache_dir: PathBuf,
}

fn load_config(path: &Option<PathBuf>) -> MarketConfig {
    match path {
        Some(p) => MarketConfig::load_from_path(p),
        None => MarketConfig::load(),
    }
}

fn cache_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("queries.sqlite")
}

fn make_client(
    config: &MarketConfig,
    cache_dir: &Path,
    offline: bool,
) -> Result<IndexerClient, Box<dyn std::error::Error>> {
    let cache = QueryCache::open(cache_path(cache_dir))?;
    let query_config = QueryConfig {
        offline,
        ..QueryConfig::new(config.indexer_url.clone())
    };
    Ok(IndexerClient::new(query_config, Some(cache))?)
}

fn format_eth(wei: u128) -> String {
    format!("{} ETH", wei as f64 / 1e18)
}

fn run_templates(args: ReadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config);
    let client = make_client(&config, &args.cache_dir, args.offline)?;
    let rt = tokio::runtime::Runtime::new()?;
    let templates = rt.block_on(client.templates())?;
    println!("{} template(s) listed", templates.len());
    for t in &templates {
        println!(
            "#{} {:<20} premium {:<12} coverage {:<12} window {}s  provider {}",
            t.policy_id,
            t.policy_type.label(),
            format_eth(t.premium),
            format_eth(t.coverage),
            t.expiration_offset_secs,
            t.provider,
        );
        if let Some(desc) = &t.description {
            println!("    {desc}");
        }
    }
    Ok(())
}

fn resolve_address(
    address: Option<String>,
    config: &MarketConfig,
    rt: &tokio::runtime::Runtime,
) -> Result<String, Box<dyn std::error::Error>> {
    match address {
        Some(a) => Ok(tripcover::indexer::normalize_address(&a)?),
        None => {
            let session = rt.block_on(Session::connect(&config.wallet_rpc_url))?;
            Ok(session.account().to_string())
        }
    }
}

fn run_policies(args: AccountArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config);
    let client = make_client(&config, &args.cache_dir, args.offline)?;
    let rt = tokio::runtime::Runtime::new()?;
    let address = resolve_address(args.address, &config, &rt)?;
    let templates = rt.block_on(client.templates())?;
    let (bought, submitted) = rt.block_on(client.bought_and_submitted(&address))?;
    let now = OffsetDateTime::now_utc();
    let policies = claimable_enriched(&bought, &submitted, &templates, now);
    println!("{} active unclaimed policy(ies) for {address}", policies.len());
    for p in &policies {
        let coverage = p.coverage.map(format_eth).unwrap_or_else(|| "?".to_string());
        let expiry = p
            .expires_at
            .and_then(|e| e.format(&time::format_description::well_known::Rfc3339).ok())
            .unwrap_or_else(|| "?".to_string());
        let expired = if p.is_expired(now) { "  [EXPIRED]" } else { "" };
        println!(
            "#{} {:<20} coverage {:<12} expires {}{}",
            p.policy_id,
            p.policy_type.label(),
            coverage,
            expiry,
            expired,
        );
    }
    Ok(())
}

fn run_claims(args: AccountArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config);
    let client = make_client(&config, &args.cache_dir, args.offline)?;
    let rt = tokio::runtime::Runtime::new()?;
    let address = resolve_address(args.address, &config, &rt)?;
    let streams = rt.block_on(client.claims_for(&address))?;
    let claims = reconcile_claims(&streams);
    println!("{} claim(s) for {address}", claims.len());
    for c in &claims {
        let amount = c
            .coverage_amount
            .map(format_eth)
            .unwrap_or_else(|| "?".to_string());
        println!(
            "claim #{} (policy #{}) {:<12} {}",
            c.claim_id,
            c.policy_id,
            amount,
            c.status.label(),
        );
    }
    Ok(())
}

fn run_provider(args: ReadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config);
    let client = make_client(&config, &args.cache_dir, args.offline)?;
    let rt = tokio::runtime::Runtime::new()?;
    let streams = rt.block_on(client.all_claim_streams())?;
    let pending = pending_claims(&streams);
    println!("Pending claims ({}):", pending.len());
    for c in &pending {
        println!(
            "  claim #{} (policy #{}) claimant {}",
            c.claim_id, c.policy_id, c.claimant
        );
    }
    for (title, status) in [
        ("Approved claims", ClaimStatus::Approved),
        ("Rejected claims", ClaimStatus::Rejected),
    ] {
        let decided: Vec<_> = reconcile_claims(&streams)
            .into_iter()
            .filter(|c| c.status == status)
            .collect();
        println!("{title} ({}):", decided.len());
        for c in &decided {
            println!(
                "  claim #{} (policy #{}) claimant {}",
                c.claim_id, c.policy_id, c.claimant
            );
        }
    }
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config);
    let client = make_client(&config, &args.cache_dir, args.offline)?;
    let rt = tokio::runtime::Runtime::new()?;
    let address = resolve_address(args.address, &config, &rt)?;
    let templates = rt.block_on(client.templates())?;
    let (bought, submitted) = rt.block_on(client.bought_and_submitted(&address))?;
    let streams = rt.block_on(client.claims_for(&address))?;
    let now = OffsetDateTime::now_utc();
    let policies = claimable_enriched(&bought, &submitted, &templates, now);
    let claims = reconcile_claims(&streams);
    let data = PortfolioData::new(address.clone(), templates, policies, claims);

    std::fs::create_dir_all(&args.reports_dir)?;
    let suffix: String = address.chars().take(10).collect();
    let html_path = args
        .out
        .unwrap_or_else(|| args.reports_dir.join(format!("{suffix}.html")));
    tripcover_report::render_portfolio(&data, &html_path)?;
    info!(?html_path, "report written");
    println!("Report written to {}", html_path.display());
    Ok(())
}

/// Re-query the indexer once after a confirmed write. The indexer may lag the
/// chain, so this can still show the pre-transaction view; that is accepted.
fn refresh_after_confirm(
    rt: &tokio::runtime::Runtime,
    client: &IndexerClient,
    account: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    client.purge_cache()?;
    let tracker = RefreshTracker::new();
    let ticket = tracker.begin();
    let streams = rt.block_on(client.claims_for(account))?;
    if tracker.accept(ticket) {
        let claims = reconcile_claims(&streams);
        info!(claims = claims.len(), "views refreshed");
    }
    Ok(())
}

fn finish_workflow(
    state: &TxState,
    rt: &tokio::runtime::Runtime,
    client: &IndexerClient,
    account: &str,
    success_msg: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match state {
        TxState::Confirmed { tx_hash } => {
            println!("{success_msg} (tx {tx_hash})");
            refresh_after_confirm(rt, client, account)?;
            Ok(())
        }
        TxState::Failed { reason } => {
            warn!(reason = %reason, "transaction failed");
            eprintln!("Failed: {reason}");
            std::process::exit(1);
        }
        other => {
            eprintln!("unexpected workflow state: {other:?}");
            std::process::exit(1);
        }
    }
}

fn run_buy(args: BuyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config);
    let client = make_client(&config, &args.cache_dir, false)?;
    let rt = tokio::runtime::Runtime::new()?;
    let session = rt.block_on(Session::connect(&config.wallet_rpc_url))?;
    let gateway = ContractGateway::new(&session, &config.contract_address)?;

    let template = rt.block_on(gateway.get_policy_template(args.policy_id))?;
    println!(
        "Buying policy #{} ({}) for {}",
        args.policy_id,
        template.policy_type.label(),
        format_eth(template.premium),
    );

    let mut workflow = TxWorkflow::new();
    let call = WriteCall::Buy {
        policy_id: args.policy_id,
        premium_wei: template.premium,
    };
    let state = rt.block_on(run_write(&mut workflow, &gateway, &call))?;
    finish_workflow(
        &state,
        &rt,
        &client,
        session.account(),
        "Policy bought successfully",
    )
}

fn run_submit_claim(args: SubmitClaimArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config);
    let client = make_client(&config, &args.cache_dir, false)?;
    let rt = tokio::runtime::Runtime::new()?;
    let session = rt.block_on(Session::connect(&config.wallet_rpc_url))?;
    let gateway = ContractGateway::new(&session, &config.contract_address)?;

    let templates = rt.block_on(client.templates())?;
    let (bought, submitted) = rt.block_on(client.bought_and_submitted(session.account()))?;
    let now = OffsetDateTime::now_utc();
    let claimable = claimable_enriched(&bought, &submitted, &templates, now);
    let Some(policy) = claimable.iter().find(|p| p.policy_id == args.policy_id) else {
        eprintln!(
            "Policy #{} is not claimable for {} (not owned, or already claimed)",
            args.policy_id,
            session.account()
        );
        std::process::exit(1);
    };
    if policy.is_expired(now) {
        eprintln!("Policy #{} has expired and cannot be claimed", args.policy_id);
        std::process::exit(1);
    }

    let mut workflow = TxWorkflow::new();
    let call = WriteCall::SubmitClaim {
        policy_id: args.policy_id,
        evidence_uri: args.evidence.clone(),
    };
    let state = rt.block_on(run_write(&mut workflow, &gateway, &call))?;
    finish_workflow(
        &state,
        &rt,
        &client,
        session.account(),
        "Claim submitted successfully",
    )
}

fn run_decide(args: DecideArgs, approve: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config);
    let client = make_client(&config, &args.cache_dir, false)?;
    let rt = tokio::runtime::Runtime::new()?;
    let session = rt.block_on(Session::connect(&config.wallet_rpc_url))?;
    let gateway = ContractGateway::new(&session, &config.contract_address)?;

    let mut workflow = TxWorkflow::new();
    let call = if approve {
        WriteCall::ApproveClaim {
            claimant: args.claimant.clone(),
            claim_id: args.claim_id,
        }
    } else {
        WriteCall::RejectClaim {
            claimant: args.claimant.clone(),
            claim_id: args.claim_id,
        }
    };
    let state = rt.block_on(run_write(&mut workflow, &gateway, &call))?;
    let msg = if approve {
        "Claim approved"
    } else {
        "Claim rejected"
    };
    finish_workflow(&state, &rt, &client, session.account(), msg)
}
