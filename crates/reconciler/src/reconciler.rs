//! After-spec retry reconciliation
//!
//! A spec file that fails while retries remain is written to the ledger
//! together with its session id. When the same spec file later passes, the
//! remote job of the first failed session is renamed and marked passed, so
//! a build that only failed on flakiness ends up green.

use std::sync::Arc;

use serde::Serialize;
use specretry_common::{
    Error, JobPatch, Result, RetriedSpec, SpecOutcome, SpecRetryConfig, SpecRun,
};
use tracing::{debug, info, warn};

use crate::jobs::JobService;
use crate::ledger::RetriedSpecsLedger;

/// What the success branch did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Reconciliation {
    /// The spec never failed before in this run
    NoPriorFailure,
    /// The failed session's job has no name to relabel
    MissingJobName { session_id: String },
    /// The failed session's job was relabeled earlier
    AlreadyRelabeled { session_id: String, name: String },
    /// The failed session's job was renamed and marked passed
    Relabeled { session_id: String, name: String },
}

/// Result of one after-spec invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AfterSpecReport {
    pub spec: Option<String>,
    pub outcome: SpecOutcome,
    /// Entry appended by the failure branch
    pub recorded: Option<RetriedSpec>,
    /// Result of the success branch
    pub reconciliation: Option<Reconciliation>,
}

/// Runner settings the reconciler depends on
#[derive(Debug, Clone, Default)]
pub struct ReconcilerSettings {
    /// How many times the runner retries a failed spec file
    pub spec_file_retries: u32,
    /// Account the remote jobs belong to
    pub username: Option<String>,
}

impl ReconcilerSettings {
    /// Failures are only worth recording when the runner will retry them
    pub fn retries_enabled(&self) -> bool {
        self.spec_file_retries > 0
    }
}

impl From<&SpecRetryConfig> for ReconcilerSettings {
    fn from(config: &SpecRetryConfig) -> Self {
        Self {
            spec_file_retries: config.spec_file_retries,
            username: config.sauce.username.clone(),
        }
    }
}

/// Decides, after every spec file, whether to record a failure or relabel
/// an earlier failed job
pub struct RetryReconciler {
    ledger: RetriedSpecsLedger,
    jobs: Option<Arc<dyn JobService>>,
    settings: ReconcilerSettings,
}

impl RetryReconciler {
    pub fn new(ledger: RetriedSpecsLedger, settings: ReconcilerSettings) -> Self {
        Self {
            ledger,
            jobs: None,
            settings,
        }
    }

    /// Attach the job service used to relabel jobs
    pub fn with_job_service(mut self, jobs: Arc<dyn JobService>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn ledger(&self) -> &RetriedSpecsLedger {
        &self.ledger
    }

    /// Hook entry point, run once per spec file.
    ///
    /// The failure and success branches are guarded independently; the
    /// outcome makes exactly one of them fire.
    pub async fn after_spec(&self, run: &SpecRun) -> Result<AfterSpecReport> {
        let outcome = run.outcome();
        let mut report = AfterSpecReport {
            spec: run.spec_path().map(str::to_string),
            outcome,
            recorded: None,
            reconciliation: None,
        };

        let Some(spec_path) = run.spec_path() else {
            warn!(
                "No spec path for session {}; skipping retry reconciliation",
                run.session_id
            );
            return Ok(report);
        };

        debug!(
            "Spec {} {} in session {} ({})",
            spec_path,
            outcome,
            run.session_id,
            run.browser_name()
        );

        if self.settings.retries_enabled() && outcome == SpecOutcome::Failed {
            report.recorded = Some(self.record_failure(&run.session_id, spec_path).await?);
        }

        if outcome == SpecOutcome::Passed {
            report.reconciliation = Some(self.reconcile_success(spec_path).await?);
        }

        Ok(report)
    }

    /// Append the failed session to the ledger
    pub async fn record_failure(&self, session_id: &str, spec_path: &str) -> Result<RetriedSpec> {
        let entry = RetriedSpec::new(session_id, spec_path);
        let specs = self.ledger.append(entry.clone()).await?;
        info!(
            "Recorded failed spec {} (session {}) for retry; {} entries in ledger",
            spec_path,
            session_id,
            specs.len()
        );
        Ok(entry)
    }

    /// Relabel the job of the first earlier failure of `spec_path`
    pub async fn reconcile_success(&self, spec_path: &str) -> Result<Reconciliation> {
        let specs = self.ledger.load().await?;
        let Some(matched) = specs.find_by_spec_path(spec_path) else {
            debug!("Spec {} has no earlier failure", spec_path);
            return Ok(Reconciliation::NoPriorFailure);
        };
        let session_id = matched.session_id.clone();

        let jobs = self.jobs.as_ref().ok_or_else(|| {
            Error::InvalidConfig("no job service configured to relabel retried jobs".into())
        })?;
        let user = self.settings.username.as_deref().ok_or_else(|| {
            Error::InvalidConfig("SAUCE_USERNAME is required to relabel retried jobs".into())
        })?;

        let job = jobs.get_job(user, &session_id).await?;
        let Some(name) = job.display_name() else {
            debug!("Job {} has no name; leaving it untouched", session_id);
            return Ok(Reconciliation::MissingJobName { session_id });
        };

        if job.is_relabeled() {
            debug!("Job {} already relabeled: {}", session_id, name);
            return Ok(Reconciliation::AlreadyRelabeled {
                session_id,
                name: name.to_string(),
            });
        }

        let patch = JobPatch::succeeded_after_retry(name);
        jobs.update_job(user, &session_id, &patch).await?;
        info!(
            "Spec {} succeeded after retry; relabeled job {} as '{}'",
            spec_path, session_id, patch.name
        );

        Ok(Reconciliation::Relabeled {
            session_id,
            name: patch.name,
        })
    }
}
