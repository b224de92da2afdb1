//! specretry CLI - Main Entry Point
//!
//! Runs the after-spec retry hook for a test runner, serves the shared
//! store, and inspects the retried-specs ledger.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use specretry_common::SpecRetryConfig;

mod client;
mod commands;
mod output;

use commands::{after, store};

/// specretry - flaky spec-file retry reconciliation
#[derive(Parser)]
#[command(name = "specretry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SPECRETRY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the after-spec hook for one spec file
    After(after::AfterArgs),

    /// Shared store service and ledger
    #[command(subcommand)]
    Store(store::StoreCommands),

    /// Check the shared store and job service configuration
    Status,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match SpecRetryConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("Invalid configuration: {}", e));
            std::process::exit(2);
        }
    };

    let result = match cli.command {
        Commands::After(args) => after::execute(args, &config, cli.format).await,
        Commands::Store(cmd) => store::execute(cmd, &config, cli.format).await,
        Commands::Status => {
            let store = client::store(&config)?;
            if store.health_check().await {
                output::print_success(&format!("Shared store is running at {}", store.base_url()));
            } else {
                output::print_error(&format!(
                    "Shared store is not responding at {}",
                    store.base_url()
                ));
                std::process::exit(1);
            }
            if config.sauce.username.is_none() || config.sauce.access_key.is_none() {
                output::print_warning(
                    "SAUCE_USERNAME / SAUCE_ACCESS_KEY not set; retried jobs cannot be relabeled",
                );
            } else {
                output::print_success(&format!(
                    "Job service: {} ({})",
                    config.sauce.base_url(),
                    config.sauce.region
                ));
            }
            Ok(())
        }
        Commands::Version => {
            println!("specretry v{}", specretry_common::VERSION);
            Ok(())
        }
    };

    if let Err(e) = result {
        let job_service = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<specretry_common::Error>())
            .any(specretry_common::Error::is_job_service);
        output::print_error(&format!("{:#}", e));
        if job_service {
            output::print_warning("The job reporting service rejected the request; check the session id and credentials");
        }
        std::process::exit(1);
    }

    Ok(())
}
