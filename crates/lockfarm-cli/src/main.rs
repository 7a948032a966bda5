//! Lockfarm CLI
//!
//! Replays staking scenarios against an in-memory farm and quotes shares.

mod scenario;

use clap::{Parser, Subcommand};
use lockfarm_engine::{FarmConfig, ShareCalculator};
use scenario::Scenario;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "lockfarm")]
#[command(author = "Lockfarm Contributors")]
#[command(version)]
#[command(about = "Lockfarm - time-locked staking ledger with share-weighted rewards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOCKFARM_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Quote the shares a deposit would receive
    Shares {
        /// Principal to deposit
        #[arg(long)]
        principal: u64,

        /// Lock duration in days
        #[arg(long, default_value = "0")]
        lock_days: u64,

        /// Lock bonus percent per year
        #[arg(long, default_value = "0")]
        bonus_per_year: u64,
    },

    /// Print the default farm configuration
    Config,
}

fn init_logging(verbose: bool, json: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Run { scenario, json } => {
            tracing::info!("Replaying scenario {:?}", scenario);
            let scenario = Scenario::load(&scenario)?;
            let report = scenario::run(&scenario)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", scenario::render_text(&report));
            }

            let failed = report.outcomes.iter().filter(|o| !o.ok).count();
            if failed > 0 {
                tracing::warn!("{} of {} steps failed", failed, report.outcomes.len());
            }
        }

        Commands::Shares {
            principal,
            lock_days,
            bonus_per_year,
        } => {
            let shares = ShareCalculator::new(bonus_per_year).shares(principal as u128, lock_days)?;
            println!("Principal:      {}", principal);
            println!("Lock:           {} days", lock_days);
            println!("Bonus per year: {}%", bonus_per_year);
            println!("Shares:         {}", shares);
        }

        Commands::Config => {
            print!("{}", FarmConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}
