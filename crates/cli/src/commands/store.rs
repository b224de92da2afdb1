//! Shared store commands

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use specretry_common::{RetriedSpec, SpecRetryConfig};
use tracing::info;

use crate::client;
use crate::output::{print_list, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand, Debug)]
pub enum StoreCommands {
    /// Run the shared store service for a test run
    Serve {
        /// Bind address (defaults to the configured store.listen)
        #[arg(long)]
        listen: Option<String>,
    },

    /// Show the retried-specs ledger without rewriting it
    Show,

    /// Empty the retried-specs ledger
    Reset,
}

/// Ledger entry display wrapper for serialization
#[derive(Serialize)]
pub struct RetriedSpecDisplay {
    pub session_id: String,
    pub spec_file_name_path: String,
}

impl From<&RetriedSpec> for RetriedSpecDisplay {
    fn from(spec: &RetriedSpec) -> Self {
        Self {
            session_id: spec.session_id.clone(),
            spec_file_name_path: spec.spec_file_name_path.clone(),
        }
    }
}

impl TableDisplay for RetriedSpecDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Session", "Spec File"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.session_id.clone(), self.spec_file_name_path.clone()]
    }
}

pub async fn execute(cmd: StoreCommands, config: &SpecRetryConfig, format: OutputFormat) -> Result<()> {
    match cmd {
        StoreCommands::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| config.store.listen.clone());
            let addr: SocketAddr = listen
                .parse()
                .with_context(|| format!("invalid listen address: {}", listen))?;
            info!("Starting shared store on {}", addr);
            specretry_store::serve(addr).await?;
        }

        StoreCommands::Show => {
            let ledger = client::ledger(config)?;
            let specs = ledger.peek().await?;
            let displays: Vec<RetriedSpecDisplay> =
                specs.iter().map(RetriedSpecDisplay::from).collect();
            print_list(&displays, format);
        }

        StoreCommands::Reset => {
            let ledger = client::ledger(config)?;
            ledger.reset().await?;
            print_success(&format!("Ledger '{}' reset", ledger.key()));
        }
    }

    Ok(())
}
