//! Full retry cycle harness

use std::sync::Arc;

use specretry_common::{MemoryStore, SpecRetryConfig, SpecRun};
use specretry_reconciler::{
    AfterSpecReport, ReconcilerSettings, RetriedSpecsLedger, RetryReconciler, SauceLabsClient,
};
use specretry_store::{api::HEALTH_PATH, HttpStore, StoreServer};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::fake_jobs::FakeJobService;
use crate::server::ServerHandle;

pub const TEST_USER: &str = "e2e-user";
pub const TEST_ACCESS_KEY: &str = "e2e-key";

/// Store service and fake job API, with configuration pointing at both
pub struct RetryHarness {
    store_server: ServerHandle,
    jobs_server: ServerHandle,
    /// Backing store of the store service
    pub backing: Arc<MemoryStore>,
    pub jobs: FakeJobService,
    pub config: SpecRetryConfig,
}

impl RetryHarness {
    /// Start both services with one retry per spec file
    pub async fn start() -> E2eResult<Self> {
        Self::start_with_retries(1).await
    }

    pub async fn start_with_retries(spec_file_retries: u32) -> E2eResult<Self> {
        let backing = Arc::new(MemoryStore::new());
        let store_router = StoreServer::new(backing.clone()).router();
        let store_server = ServerHandle::spawn("store", store_router, HEALTH_PATH).await?;

        let jobs = FakeJobService::new();
        let jobs_server = ServerHandle::spawn("job-api", jobs.router(), "/health").await?;

        let mut config = SpecRetryConfig::default();
        config.spec_file_retries = spec_file_retries;
        config.store.url = store_server.base_url().to_string();
        config.sauce.username = Some(TEST_USER.to_string());
        config.sauce.access_key = Some(TEST_ACCESS_KEY.to_string());
        config.sauce.api_url = Some(jobs_server.base_url().to_string());

        Ok(Self {
            store_server,
            jobs_server,
            backing,
            jobs,
            config,
        })
    }

    /// A reconciler as one test-runner worker would build it
    pub fn reconciler(&self) -> E2eResult<RetryReconciler> {
        let store = Arc::new(HttpStore::new(&self.config.store.url, self.config.http_timeout())?);
        let ledger = RetriedSpecsLedger::new(store, self.config.retried_specs_key.clone())
            .with_max_append_attempts(self.config.max_append_attempts);
        let jobs = Arc::new(SauceLabsClient::from_config(&self.config)?);

        Ok(RetryReconciler::new(ledger, ReconcilerSettings::from(&self.config))
            .with_job_service(jobs))
    }

    /// Run the after-spec hook for one spec-file execution
    pub async fn run_spec(
        &self,
        result: i32,
        session_id: &str,
        spec: &str,
    ) -> E2eResult<AfterSpecReport> {
        let run = SpecRun {
            result,
            session_id: session_id.to_string(),
            capabilities: serde_json::json!({"browserName": "chrome", "platformName": "Windows 11"}),
            specs: vec![spec.to_string()],
        };
        debug!("after_spec result={} session={} spec={}", result, session_id, spec);
        Ok(self.reconciler()?.after_spec(&run).await?)
    }

    /// Current name of the job created for `session_id`
    pub fn job_name(&self, session_id: &str) -> E2eResult<String> {
        self.jobs
            .job(session_id)
            .and_then(|job| job.get("name").and_then(|n| n.as_str()).map(str::to_string))
            .ok_or_else(|| E2eError::UnexpectedJobState(format!("no named job for {}", session_id)))
    }

    pub async fn shutdown(self) {
        self.store_server.stop().await;
        self.jobs_server.stop().await;
    }
}
