//! Total order over rows for a given key spec.

use std::cmp::Ordering;
use std::sync::Arc;

use spillsort_core::types::{Row, RowBatch, Scalar};

use crate::sort::keys::{SortDirection, SortKey, SortKeySpec};
use crate::traits::{Result, SortError};

#[derive(Debug, Clone)]
pub struct RecordComparator {
    fields: Vec<String>,
    directions: Arc<[SortDirection]>,
}

impl RecordComparator {
    pub fn new(keys: &SortKeySpec) -> Self {
        Self {
            fields: keys.fields().map(str::to_string).collect(),
            directions: keys.directions(),
        }
    }

    /// Validate `keys` and build a comparator from them.
    pub fn try_new(keys: &[SortKey]) -> Result<Self> {
        Ok(Self::new(&SortKeySpec::new(keys)?))
    }

    /// Compare two rows key by key; the first non-equal key decides.
    ///
    /// Missing fields are a `FieldResolution` error rather than an implicit
    /// null, because there is no sensible place to order them.
    pub fn compare(&self, a: &Row, b: &Row) -> Result<Ordering> {
        for (field, direction) in self.fields.iter().zip(self.directions.iter()) {
            let ord = direction.apply(resolve(a, field)?.total_cmp(resolve(b, field)?));
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(Ordering::Equal)
    }

    /// Key tuple of `row`, in key order.
    pub fn extract_keys(&self, row: &Row) -> Result<Vec<Scalar>> {
        self.fields
            .iter()
            .map(|field| resolve(row, field).cloned())
            .collect()
    }

    /// Compare two tuples produced by [`RecordComparator::extract_keys`].
    pub fn compare_keys(&self, a: &[Scalar], b: &[Scalar]) -> Ordering {
        compare_key_tuples(&self.directions, a, b)
    }

    pub fn directions(&self) -> Arc<[SortDirection]> {
        Arc::clone(&self.directions)
    }

    /// Stable in-place sort of a batch.
    ///
    /// Every key is resolved before any row moves, so a missing field leaves
    /// the batch untouched.
    pub fn sort_batch(&self, batch: &mut RowBatch) -> Result<()> {
        let keys = batch
            .rows
            .iter()
            .map(|row| self.extract_keys(row))
            .collect::<Result<Vec<_>>>()?;

        let mut keyed: Vec<(Vec<Scalar>, Row)> =
            keys.into_iter().zip(std::mem::take(&mut batch.rows)).collect();
        keyed.sort_by(|(ka, _), (kb, _)| self.compare_keys(ka, kb));
        batch.rows = keyed.into_iter().map(|(_, row)| row).collect();
        Ok(())
    }
}

pub(crate) fn compare_key_tuples(
    directions: &[SortDirection],
    a: &[Scalar],
    b: &[Scalar],
) -> Ordering {
    for ((x, y), direction) in a.iter().zip(b.iter()).zip(directions.iter()) {
        match direction.apply(x.total_cmp(y)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn resolve<'r>(row: &'r Row, field: &str) -> Result<&'r Scalar> {
    row.get(field).ok_or_else(|| SortError::FieldResolution {
        field: field.to_string(),
    })
}
