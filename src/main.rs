mod adapters;
mod bootstrap;
mod config;
mod error;
mod execution;
mod ledger;
mod monitor;
mod settlement;

#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::monitor::MonitorController;

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "roundup-monitor")]
#[command(about = "Sweeps spare-change round-ups from a Solana wallet into a savings vault")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Validate configuration and exit
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Activate the vault and monitor the owner wallet until ctrl-c (default)
    Run,
    /// Print the reconciled savings view and exit
    Status,
    /// Withdraw SOL from the vault back to the owner
    Withdraw {
        #[arg(long)]
        amount: Decimal,
    },
    /// Mark the vault inactive
    Deactivate,
}

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,roundup_monitor=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting round-up savings monitor");

    let config = config::MonitorConfig::from_env()?;
    info!("Configuration loaded: {:?}", config);

    if cli.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    let bootstrap::App {
        account,
        mut controller,
    } = bootstrap::initialize_app(&config)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let snapshot = controller.activate(account).await?;
            info!(
                "✅ Vault active: {} SOL saved over {} deposits",
                snapshot.net_saved(),
                snapshot.deposit_count
            );
            run_until_shutdown(&mut controller).await;
        }
        Command::Status => {
            if controller.vault().refresh().await?.is_none() {
                warn!("⚠️ No vault found for {}", account.address);
            }
            println!("{}", serde_json::to_string_pretty(&controller.view())?);
        }
        Command::Withdraw { amount } => {
            controller.vault().refresh().await?;
            let signature = controller.vault().withdraw(amount).await?;
            info!("✓ Withdrawal confirmed: {}", signature);
        }
        Command::Deactivate => {
            controller.deactivate().await?;
            info!("✓ Vault deactivated for {}", account.address);
        }
    }

    Ok(())
}

async fn run_until_shutdown(controller: &mut MonitorController) {
    let mut status = tokio::time::interval(STATUS_INTERVAL);
    status.tick().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("❌ Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
            _ = status.tick() => {
                if !controller.is_monitoring() {
                    warn!("⚠️ Monitor session is no longer running");
                    break;
                }
                match serde_json::to_string(&controller.view()) {
                    Ok(line) => info!(
                        state = ?controller.state(),
                        session = ?controller.session_id(),
                        "📊 {}",
                        line
                    ),
                    Err(e) => warn!("⚠️ Failed to serialize status: {}", e),
                }
            }
        }
    }

    info!("🔄 Shutting down...");
    controller.stop().await;
    info!("✓ Monitor stopped");
}
