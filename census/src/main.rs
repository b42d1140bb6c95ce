//! LLM census entry point

use clap::Parser;
use llm_census::cli::{rekey, scan, Cli, Commands};
use llm_census::logging;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Scan(args) => {
            let config = args.resolve_config().await?;
            let _guard = logging::init(config.log_dir.as_deref())?;

            let cancel = CancellationToken::new();
            spawn_interrupt_handler(cancel.clone());

            let report = scan::execute(config, cancel).await?;
            if report.cancelled {
                warn!("Scan interrupted");
            }
            Ok(())
        }
        Commands::Rekey(args) => {
            let _guard = logging::init(None)?;
            let records = rekey::execute(&args).await?;
            info!(records = records, "Rekey complete");
            Ok(())
        }
    }
}

/// Ctrl+C cancels the running scan; in-flight probes are abandoned
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping scan");
                cancel.cancel();
            }
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
    });
}
