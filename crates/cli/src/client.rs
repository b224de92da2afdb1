//! Builds store and reconciler handles from configuration

use std::sync::Arc;

use anyhow::{Context, Result};
use specretry_common::SpecRetryConfig;
use specretry_reconciler::{
    JobService, ReconcilerSettings, RetriedSpecsLedger, RetryReconciler, SauceLabsClient,
};
use specretry_store::HttpStore;
use tracing::debug;

/// Client for the shared store service named in the configuration
pub fn store(config: &SpecRetryConfig) -> Result<Arc<HttpStore>> {
    let store = HttpStore::new(&config.store.url, config.http_timeout())
        .with_context(|| format!("creating store client for {}", config.store.url))?;
    Ok(Arc::new(store))
}

/// Ledger under the configured key
pub fn ledger(config: &SpecRetryConfig) -> Result<RetriedSpecsLedger> {
    Ok(
        RetriedSpecsLedger::new(store(config)?, config.retried_specs_key.clone())
            .with_max_append_attempts(config.max_append_attempts),
    )
}

/// Reconciler wired to the store service and, when credentials are set,
/// the job reporting service
pub fn reconciler(config: &SpecRetryConfig) -> Result<RetryReconciler> {
    let reconciler = RetryReconciler::new(ledger(config)?, ReconcilerSettings::from(config));

    if config.sauce.username.is_none() || config.sauce.access_key.is_none() {
        debug!("No job service credentials; relabeling is unavailable");
        return Ok(reconciler);
    }

    let jobs: Arc<dyn JobService> = Arc::new(SauceLabsClient::from_config(config)?);
    debug!("Job service at {}", config.sauce.base_url());
    Ok(reconciler.with_job_service(jobs))
}
