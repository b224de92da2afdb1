//! specretry Common Library
//!
//! Shared types, the shared-store contract, stored-ledger decoding and
//! configuration for the specretry workspace.

pub mod config;
pub mod error;
pub mod store;
pub mod stored;
pub mod types;

// Re-export commonly used types
pub use config::{SauceConfig, SpecRetryConfig, StoreConfig};
pub use error::{Error, Result};
pub use store::{MemoryStore, SharedStore};
pub use stored::StoredShape;
pub use types::*;

/// specretry version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Well-known key the retried-specs ledger lives under
pub const DEFAULT_RETRIED_SPECS_KEY: &str = "retriedSpecs";
