//! Strongly-typed identifiers used across the engine.
//!
//! Downstream crates should pass `PartitionId` around rather than raw strings.
//!
//! Caller-supplied ids and derived child ids live in disjoint namespaces:
//! children are joined with [`DERIVED_SEP`], and `PartitionId::new` escapes
//! that separator (and the `%` escape byte) in caller input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator reserved for derived child ids.
pub const DERIVED_SEP: char = '/';

/// Key addressing one append-only stream of batches inside a chunked cache.
///
/// The serialized form is the encoded id, as returned by [`PartitionId::as_str`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.contains(['%', DERIVED_SEP]) {
            Self(escape(&id))
        } else {
            Self(id)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a run-scoped child id, e.g. `orders/chunk/3`.
    ///
    /// Derivation is deterministic and injective: distinct bases or tags never
    /// share children, and no caller id can spell a derived one.
    pub fn derive(&self, tag: &str, index: usize) -> PartitionId {
        PartitionId(format!(
            "{}{sep}{}{sep}{}",
            self.0,
            escape(tag),
            index,
            sep = DERIVED_SEP
        ))
    }

    /// Whether this id was produced by [`PartitionId::derive`].
    pub fn is_derived(&self) -> bool {
        self.0.contains(DERIVED_SEP)
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            DERIVED_SEP => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartitionId {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for PartitionId {
    fn from(v: String) -> Self {
        Self::new(v)
    }
}
