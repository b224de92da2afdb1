//! specretry Reconciler
//!
//! Runs after every spec file. A failure that can still be retried is
//! recorded in the shared ledger; a later success of the same spec file
//! relabels the remote job of the failed session as passed.

pub mod jobs;
pub mod ledger;
pub mod reconciler;

pub use jobs::{JobService, SauceLabsClient};
pub use ledger::RetriedSpecsLedger;
pub use reconciler::{AfterSpecReport, Reconciliation, ReconcilerSettings, RetryReconciler};
