//! specretry E2E Test Framework
//!
//! Runs whole retry cycles over real HTTP:
//! - the shared store service, reached through `HttpStore`
//! - a fake job reporting service, reached through `SauceLabsClient`
//! - the reconciler driven the way a test runner drives it, one
//!   `after_spec` call per spec-file execution
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      RetryHarness                          │
//! ├───────────────────────────────────────────────────────────┤
//! │  ServerHandle (store)      ServerHandle (fake job API)     │
//! │        ▲                          ▲                        │
//! │        │ HttpStore                │ SauceLabsClient        │
//! │        └──────── RetryReconciler ─┘                        │
//! │                        ▲                                   │
//! │              run_spec(result, session, spec)               │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fake_jobs;
pub mod harness;
pub mod server;

pub use error::{E2eError, E2eResult};
pub use fake_jobs::FakeJobService;
pub use harness::RetryHarness;
pub use server::ServerHandle;

/// Install a test log subscriber once; honours `RUST_LOG`
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
