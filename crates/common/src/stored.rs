//! Decoding of the raw value stored under the retried-specs key
//!
//! Other workers (or older tooling) may have written the ledger in a
//! different shape. Everything read from the store goes through
//! [`StoredShape::classify`] once, and the caller acts on the variant.

use serde_json::Value;
use tracing::warn;

use crate::types::{RetriedSpec, RetriedSpecs};

/// Shape of the value found under the ledger key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredShape {
    /// A well-formed array of entries
    Sequence(RetriedSpecs),
    /// Absent or falsy (`null`, `false`, `0`, `""`)
    Uninitialized,
    /// A keyed object whose values are entries
    Keyed(RetriedSpecs),
    /// Anything else
    Malformed,
}

impl StoredShape {
    pub fn classify(raw: Option<&Value>) -> Self {
        let value = match raw {
            None => return StoredShape::Uninitialized,
            Some(v) if is_falsy(v) => return StoredShape::Uninitialized,
            Some(v) => v,
        };

        match value {
            Value::Array(items) => match decode_entries(items.iter()) {
                Some(specs) => StoredShape::Sequence(specs),
                None => StoredShape::Malformed,
            },
            Value::Object(map) => {
                // Integer-like keys come first in ascending order, then the rest.
                let mut indexed: Vec<(u64, &Value)> = Vec::new();
                let mut named: Vec<&Value> = Vec::new();
                for (key, v) in map {
                    match key.parse::<u64>() {
                        Ok(idx) if idx.to_string() == *key => indexed.push((idx, v)),
                        _ => named.push(v),
                    }
                }
                indexed.sort_by_key(|(idx, _)| *idx);

                let ordered = indexed.into_iter().map(|(_, v)| v).chain(named);
                match decode_entries(ordered) {
                    Some(specs) => StoredShape::Keyed(specs),
                    None => StoredShape::Malformed,
                }
            }
            _ => StoredShape::Malformed,
        }
    }

    /// The entries this shape stands for; uninitialized and malformed are empty
    pub fn into_specs(self) -> RetriedSpecs {
        match self {
            StoredShape::Sequence(specs) | StoredShape::Keyed(specs) => specs,
            StoredShape::Uninitialized | StoredShape::Malformed => RetriedSpecs::new(),
        }
    }

    /// Whether the stored value must be rewritten to become a plain sequence
    pub fn needs_rewrite(&self) -> bool {
        !matches!(self, StoredShape::Sequence(_))
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Decode every element, or none. The first undecodable element is logged.
fn decode_entries<'a>(items: impl Iterator<Item = &'a Value>) -> Option<RetriedSpecs> {
    let mut specs = Vec::new();
    for (position, item) in items.enumerate() {
        match serde_json::from_value::<RetriedSpec>(item.clone()) {
            Ok(spec) => specs.push(spec),
            Err(e) => {
                warn!(
                    "Undecodable retried spec at position {}: {} ({})",
                    position, item, e
                );
                return None;
            }
        }
    }
    Some(RetriedSpecs::from(specs))
}
