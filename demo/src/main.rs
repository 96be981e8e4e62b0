//! MEDGATE — Demo CLI
//!
//! Runs the session and credential review scenarios against an in-process
//! auth server with seeded, fictional accounts. Time is simulated, so token
//! expiry happens instantly.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- pending
//!   cargo run -p demo -- --config config/medgate.toml refresh

mod scenarios;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medgate_contracts::error::MedgateResult;
use medgate_guard::RouteGuard;
use medgate_server::ServerConfig;

use scenarios::Stage;

// ── CLI definition ────────────────────────────────────────────────────────────

/// MEDGATE — session lifecycle and credential review demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "MEDGATE session and credential review demo",
    long_about = "Runs MEDGATE scenarios showing review gating, forced logout of\n\
                  blocked accounts, reapply, and silent token refresh."
)]
struct Cli {
    /// Server config TOML. Development secrets are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Route table TOML. The built-in hospital table is used when omitted.
    #[arg(long, global = true)]
    routes: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all five scenarios in sequence.
    RunAll,
    /// Scenario A: fresh doctor is held on the review-pending page.
    Pending,
    /// Scenario B: rejection blocks the doctor and shows the reason.
    Reject,
    /// Scenario C: the rejected doctor reapplies.
    Reapply,
    /// Scenario D: an expired access token is refreshed invisibly.
    Refresh,
    /// Scenario E: an expired refresh token ends the session.
    Expire,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    match run(&cli).await {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> MedgateResult<()> {
    let config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::development(),
    };
    let guard = match &cli.routes {
        Some(path) => RouteGuard::from_file(path)?,
        None => RouteGuard::hospital()?,
    };
    // Each scenario gets a fresh server so they do not see each other's reviews.
    let stage = || Stage::new(&config, guard.clone());

    match cli.command {
        Command::RunAll => {
            scenarios::pending_doctor(&stage()?).await?;
            scenarios::rejected_doctor(&stage()?).await?;
            scenarios::reapply(&stage()?).await?;
            scenarios::silent_refresh(&stage()?).await?;
            scenarios::dead_refresh(&stage()?).await
        }
        Command::Pending => scenarios::pending_doctor(&stage()?).await,
        Command::Reject => scenarios::rejected_doctor(&stage()?).await,
        Command::Reapply => scenarios::reapply(&stage()?).await,
        Command::Refresh => scenarios::silent_refresh(&stage()?).await,
        Command::Expire => scenarios::dead_refresh(&stage()?).await,
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("MEDGATE — Session Lifecycle & Credential Review");
    println!("===============================================");
    println!();
    println!("Per navigation:");
    println!("  [1] Session client restores identity via whoami (one call per burst)");
    println!("  [2] Gateway renews an expired access token once, or ends the session");
    println!("  [3] Route guard combines isActive and review status into render/redirect");
    println!("  [4] Review transitions are written to a SHA-256 hash-chained ledger");
    println!();
}
