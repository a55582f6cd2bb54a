//! Sort keys: which field, which direction.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::traits::{Result, SortError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Orient a natural-order comparison. Desc reverses the result, never
    /// the values, so it works for every comparable type.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(SortError::Config(format!("unknown sort direction '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Parses `"field"` or `"field asc|desc"`.
impl FromStr for SortKey {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let field = parts
            .next()
            .ok_or_else(|| SortError::Config("empty sort key".into()))?;
        let direction = match parts.next() {
            Some(d) => d.parse()?,
            None => SortDirection::Asc,
        };
        if let Some(extra) = parts.next() {
            return Err(SortError::Config(format!(
                "unexpected token '{extra}' in sort key '{s}'"
            )));
        }
        Ok(SortKey::new(field, direction))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())
    }
}

/// Validated, non-empty ordered list of sort keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKeySpec {
    keys: Vec<SortKey>,
}

impl SortKeySpec {
    pub fn new(keys: &[SortKey]) -> Result<Self> {
        if keys.is_empty() {
            return Err(SortError::Config("at least one sort key is required".into()));
        }
        if let Some(k) = keys.iter().find(|k| k.field.trim().is_empty()) {
            return Err(SortError::Config(format!(
                "sort key with empty field name ({})",
                k.direction.as_str()
            )));
        }
        Ok(Self {
            keys: keys.to_vec(),
        })
    }

    /// Parse a comma-separated list such as `"city asc, age desc"`.
    pub fn parse(s: &str) -> Result<Self> {
        let keys = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<SortKey>)
            .collect::<Result<Vec<SortKey>>>()?;
        Self::new(&keys)
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.field.as_str())
    }

    pub fn directions(&self) -> Arc<[SortDirection]> {
        self.keys.iter().map(|k| k.direction).collect()
    }
}
