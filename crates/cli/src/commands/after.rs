//! After-spec hook command
//!
//! Called by the test runner once per spec file, after it finished.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use specretry_common::{SpecRetryConfig, SpecRun};
use specretry_reconciler::{AfterSpecReport, Reconciliation};

use crate::client;
use crate::output::{print_item, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct AfterArgs {
    /// Runner result for the spec file (0 = passed)
    #[arg(long, allow_hyphen_values = true)]
    pub result: i32,

    /// Browser session the spec file ran in
    #[arg(long, env = "SPECRETRY_SESSION_ID")]
    pub session_id: String,

    /// Spec file paths executed; the first identifies the spec
    #[arg(long = "spec", required = true)]
    pub specs: Vec<String>,

    /// Session capabilities as JSON
    #[arg(long)]
    pub capabilities: Option<String>,
}

impl AfterArgs {
    pub fn to_spec_run(&self) -> Result<SpecRun> {
        let capabilities = match &self.capabilities {
            Some(raw) => serde_json::from_str(raw).context("parsing --capabilities as JSON")?,
            None => serde_json::Value::Null,
        };

        Ok(SpecRun {
            result: self.result,
            session_id: self.session_id.clone(),
            capabilities,
            specs: self.specs.clone(),
        })
    }
}

/// Report display wrapper for serialization
#[derive(Serialize)]
pub struct ReportDisplay {
    #[serde(flatten)]
    report: AfterSpecReport,
}

impl TableDisplay for ReportDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Spec", "Outcome", "Recorded Session", "Reconciliation"]
    }

    fn row(&self) -> Vec<String> {
        let r = &self.report;
        vec![
            r.spec.clone().unwrap_or_else(|| "-".to_string()),
            r.outcome.to_string(),
            r.recorded
                .as_ref()
                .map(|s| s.session_id.clone())
                .unwrap_or_else(|| "-".to_string()),
            r.reconciliation
                .as_ref()
                .map(describe)
                .unwrap_or_else(|| "-".to_string()),
        ]
    }
}

fn describe(reconciliation: &Reconciliation) -> String {
    match reconciliation {
        Reconciliation::NoPriorFailure => "no earlier failure".to_string(),
        Reconciliation::MissingJobName { session_id } => {
            format!("job {} has no name", session_id)
        }
        Reconciliation::AlreadyRelabeled { session_id, .. } => {
            format!("job {} already relabeled", session_id)
        }
        Reconciliation::Relabeled { session_id, name } => {
            format!("job {} relabeled: {}", session_id, name)
        }
    }
}

pub async fn execute(args: AfterArgs, config: &SpecRetryConfig, format: OutputFormat) -> Result<()> {
    let run = args.to_spec_run()?;
    let reconciler = client::reconciler(config)?;

    let report = reconciler
        .after_spec(&run)
        .await
        .context("after-spec retry reconciliation failed")?;

    print_item(&ReportDisplay { report }, format);
    Ok(())
}
