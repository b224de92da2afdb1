//! Retried-specs ledger on top of the shared store

use std::sync::Arc;

use serde_json::Value;
use specretry_common::{Error, Result, RetriedSpec, RetriedSpecs, SharedStore, StoredShape};
use tracing::{debug, info, warn};

/// Default number of compare-and-set attempts for an append
const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 16;

/// Ledger of failed spec sessions, persisted under a single store key
pub struct RetriedSpecsLedger {
    store: Arc<dyn SharedStore>,
    key: String,
    max_append_attempts: u32,
}

impl RetriedSpecsLedger {
    pub fn new(store: Arc<dyn SharedStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            max_append_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
        }
    }

    pub fn with_max_append_attempts(mut self, attempts: u32) -> Self {
        self.max_append_attempts = attempts.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the ledger, rewriting the stored value if it is not a plain sequence.
    ///
    /// Malformed content never surfaces as an error: it is replaced by an
    /// empty sequence. Store I/O errors propagate.
    pub async fn load(&self) -> Result<RetriedSpecs> {
        let raw = self.store.get(&self.key).await?;
        let shape = StoredShape::classify(raw.as_ref());

        match &shape {
            StoredShape::Sequence(_) => {}
            StoredShape::Uninitialized => {
                debug!("Initializing retried specs ledger under '{}'", self.key);
            }
            StoredShape::Keyed(specs) => {
                info!(
                    "Normalizing keyed retried specs ledger under '{}' ({} entries)",
                    self.key,
                    specs.len()
                );
            }
            StoredShape::Malformed => {
                warn!("Resetting malformed retried specs ledger under '{}'", self.key);
            }
        }

        let rewrite = shape.needs_rewrite();
        let specs = shape.into_specs();
        if rewrite {
            self.store.set(&self.key, specs.to_value()).await?;
        }
        Ok(specs)
    }

    /// Read the ledger as `load` would see it, without writing to the store
    pub async fn peek(&self) -> Result<RetriedSpecs> {
        let raw = self.store.get(&self.key).await?;
        Ok(StoredShape::classify(raw.as_ref()).into_specs())
    }

    /// Append an entry without losing concurrent appends.
    ///
    /// Each attempt reads the raw value, normalizes it in memory, pushes the
    /// entry and swaps it in only if nobody wrote in between.
    pub async fn append(&self, spec: RetriedSpec) -> Result<RetriedSpecs> {
        for attempt in 1..=self.max_append_attempts {
            let raw = self.store.get(&self.key).await?;
            let mut specs = StoredShape::classify(raw.as_ref()).into_specs();
            specs.push(spec.clone());

            if self
                .store
                .compare_and_set(&self.key, raw.as_ref(), specs.to_value())
                .await?
            {
                return Ok(specs);
            }
            debug!(
                "Ledger '{}' changed during append (attempt {}/{})",
                self.key, attempt, self.max_append_attempts
            );
        }

        Err(Error::Conflict {
            key: self.key.clone(),
            attempts: self.max_append_attempts,
        })
    }

    /// Replace the ledger with an empty sequence
    pub async fn reset(&self) -> Result<()> {
        self.store
            .set(&self.key, Value::Array(Vec::new()))
            .await
    }
}
