//! Lightweight row-oriented record model.
//!
//! The sorting engine only ever asks a record for "the value of field X", so a
//! row is an ordered list of named scalars and a batch is an ordered list of
//! rows. Execution layers that use Arrow or another columnar format convert at
//! the edges.

use std::cmp::Ordering;
use std::mem::size_of;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(#[serde(with = "float_bits::bits32")] f32),
    F64(#[serde(with = "float_bits::bits64")] f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    /// Total order over scalars.
    ///
    /// Nulls sort first. Integers of any width compare numerically, and so do
    /// integers against floats, exactly and without rounding through `f64`.
    /// NaN sorts after every other number. Strings and binaries compare
    /// lexicographically; any other mix of types falls back to a fixed type
    /// rank so the order stays total.
    pub fn total_cmp(&self, other: &Scalar) -> Ordering {
        use Scalar::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Bool(x), Bool(y)) => x.cmp(y),
            (Str(x), Str(y)) => x.cmp(y),
            (Bin(x), Bin(y)) => x.cmp(y),
            _ => match (self.as_int(), other.as_int(), self.as_float(), other.as_float()) {
                (Some(x), Some(y), _, _) => x.cmp(&y),
                (Some(x), _, _, Some(y)) => int_float_cmp(x, y),
                (_, Some(y), Some(x), _) => int_float_cmp(y, x).reverse(),
                (_, _, Some(x), Some(y)) => float_cmp(x, y),
                _ => type_rank(self).cmp(&type_rank(other)),
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::I32(v) => Some(i64::from(*v)),
            Scalar::I64(v) => Some(*v),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::F32(v) => Some(f64::from(*v)),
            Scalar::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Rough heap + inline footprint, used for memory accounting.
    pub fn estimated_bytes(&self) -> usize {
        let heap = match self {
            Scalar::Str(s) => s.capacity(),
            Scalar::Bin(b) => b.capacity(),
            _ => 0,
        };
        size_of::<Scalar>() + heap
    }
}

fn float_cmp(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer against a float.
fn int_float_cmp(x: i64, y: f64) -> Ordering {
    // 2^63 is the first float above every i64; -2^63 is itself an i64.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if y.is_nan() || y >= BOUND {
        return Ordering::Less;
    }
    if y < -BOUND {
        return Ordering::Greater;
    }
    let whole = y.trunc();
    // `whole` is integral and within i64 range, so the cast is exact.
    x.cmp(&(whole as i64)).then_with(|| {
        if y > whole {
            Ordering::Less
        } else if y < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

/// Floats travel as their IEEE-754 bit pattern so NaN, infinities and -0.0
/// survive formats with no spelling for them (JSON writes NaN as `null`).
mod float_bits {
    pub mod bits32 {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &f32, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_u32(v.to_bits())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f32, D::Error> {
            u32::deserialize(d).map(f32::from_bits)
        }
    }

    pub mod bits64 {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_u64(v.to_bits())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
            u64::deserialize(d).map(f64::from_bits)
        }
    }
}

/// Numeric order assigned to scalar kinds for mixed-type comparisons.
fn type_rank(s: &Scalar) -> u8 {
    use Scalar::*;
    match s {
        Null => 0,
        Bool(_) => 1,
        I32(_) | I64(_) | F32(_) | F64(_) => 2,
        Str(_) => 3,
        Bin(_) => 4,
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Scalar::Bin(v)
    }
}

/// A single record: an ordered set of named fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub fields: Vec<(String, Scalar)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing any existing value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Like [`Row::get`] but a missing field is an error.
    pub fn value(&self, name: &str) -> Result<&Scalar> {
        self.get(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn estimated_bytes(&self) -> usize {
        size_of::<Row>()
            + self
                .fields
                .iter()
                .map(|(name, value)| name.capacity() + value.estimated_bytes())
                .sum::<usize>()
    }
}

/// Ordered group of rows processed as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub rows: Vec<Row>,
}

impl RowBatch {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Batch holding exactly one row.
    pub fn single(row: Row) -> Self {
        Self { rows: vec![row] }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Concatenate `other` onto the end of this batch.
    pub fn append(&mut self, mut other: RowBatch) {
        if self.rows.is_empty() {
            self.rows = other.rows;
        } else {
            self.rows.append(&mut other.rows);
        }
    }

    /// Detach and return the first `n` rows (or all of them if fewer).
    pub fn split_front(&mut self, n: usize) -> RowBatch {
        let n = n.min(self.rows.len());
        let rest = self.rows.split_off(n);
        RowBatch {
            rows: std::mem::replace(&mut self.rows, rest),
        }
    }

    /// Split into consecutive sub-batches of at most `size` rows.
    pub fn chunks(mut self, size: usize) -> Result<Vec<RowBatch>> {
        if size == 0 {
            return Err(Error::Config("chunk size must be greater than 0".into()));
        }
        let mut out = Vec::with_capacity(self.rows.len().div_ceil(size));
        while !self.rows.is_empty() {
            out.push(self.split_front(size));
        }
        Ok(out)
    }

    /// One single-row batch per row, in order.
    pub fn into_singletons(self) -> impl Iterator<Item = RowBatch> {
        self.rows.into_iter().map(RowBatch::single)
    }

    /// Project one field across all rows.
    pub fn values(&self, field: &str) -> Result<Vec<Scalar>> {
        self.rows
            .iter()
            .map(|row| row.value(field).cloned())
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn estimated_bytes(&self) -> usize {
        size_of::<RowBatch>() + self.rows.iter().map(Row::estimated_bytes).sum::<usize>()
    }
}

impl FromIterator<Row> for RowBatch {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RowBatch {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
