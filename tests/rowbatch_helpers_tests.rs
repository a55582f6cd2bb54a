//! RowBatch helper and comparator tests (sort, chunk, concat)

mod test_data_gen;

use spillsort_core::types::{Row, RowBatch, Scalar};
use spillsort_sort::{RecordComparator, SortKey, SortKeySpec};
use test_data_gen::{generate_random_batch, tuples};

fn values(batch: &RowBatch, field: &str) -> Vec<Scalar> {
    batch.values(field).expect("field present")
}

#[test]
fn test_sort_by_single_field() {
    // Create unsorted batch
    let mut batch: RowBatch = [50, 10, 30, 20, 40]
        .iter()
        .map(|&v| Row::new().with("value", v as i64))
        .collect();

    RecordComparator::try_new(&[SortKey::asc("value")])
        .expect("comparator")
        .sort_batch(&mut batch)
        .expect("Sort failed");

    // Verify ascending order
    assert_eq!(
        values(&batch, "value"),
        [10, 20, 30, 40, 50].map(Scalar::I64).to_vec()
    );
}

#[test]
fn test_sort_by_multiple_fields() {
    let mut batch: RowBatch = [("B", 2), ("A", 3), ("B", 1), ("A", 1)]
        .iter()
        .map(|&(c, p)| Row::new().with("category", c).with("priority", p))
        .collect();

    let spec = SortKeySpec::parse("category, priority").expect("keys");
    RecordComparator::new(&spec)
        .sort_batch(&mut batch)
        .expect("Sort failed");

    // Verify lexicographic order: (A,1), (A,3), (B,1), (B,2)
    assert_eq!(
        tuples(&batch.rows, &["category", "priority"]),
        vec![
            vec![Scalar::from("A"), Scalar::I32(1)],
            vec![Scalar::from("A"), Scalar::I32(3)],
            vec![Scalar::from("B"), Scalar::I32(1)],
            vec![Scalar::from("B"), Scalar::I32(2)],
        ]
    );
}

#[test]
fn test_sort_with_nulls_and_mixed_numeric() {
    let mut batch = RowBatch::new(vec![
        Row::new().with("v", 2.5f64),
        Row::new().with("v", Scalar::Null),
        Row::new().with("v", 2i32),
        Row::new().with("v", 3i64),
        Row::new().with("v", f64::NAN),
    ]);

    RecordComparator::try_new(&[SortKey::asc("v")])
        .expect("comparator")
        .sort_batch(&mut batch)
        .expect("Sort failed");

    let v = values(&batch, "v");
    assert_eq!(v[0], Scalar::Null);
    assert_eq!(v[1], Scalar::I32(2));
    assert_eq!(v[2], Scalar::F64(2.5));
    assert_eq!(v[3], Scalar::I64(3));
    assert!(matches!(v[4], Scalar::F64(x) if x.is_nan()));
}

#[test]
fn test_sort_empty_batch() {
    let mut batch = RowBatch::empty();
    RecordComparator::try_new(&[SortKey::asc("anything")])
        .expect("comparator")
        .sort_batch(&mut batch)
        .expect("empty sort");
    assert!(batch.is_empty());
}

#[test]
fn test_sort_missing_field_leaves_batch_intact() {
    let mut batch = generate_random_batch(10, 1);
    let before = batch.clone();
    let err = RecordComparator::try_new(&[SortKey::asc("nope")])
        .expect("comparator")
        .sort_batch(&mut batch)
        .expect_err("missing field");
    assert!(err.to_string().contains("nope"));
    assert_eq!(batch, before);
}

#[test]
fn test_sort_preserves_row_contents() {
    let mut batch = generate_random_batch(100, 8);
    let mut expected = tuples(&batch.rows, &["name", "id", "group"]);
    expected.sort_by(|a, b| a[0].total_cmp(&b[0]));

    RecordComparator::try_new(&[SortKey::asc("name")])
        .expect("comparator")
        .sort_batch(&mut batch)
        .expect("Sort failed");

    // Whole rows move together, not just the key field.
    assert_eq!(tuples(&batch.rows, &["name", "id", "group"]), expected);
}

#[test]
fn test_chunks_and_concat() {
    let batch = generate_random_batch(23, 2);
    let names = values(&batch, "name");

    let chunks = batch.chunks(5).expect("chunks");
    assert_eq!(
        chunks.iter().map(RowBatch::num_rows).collect::<Vec<_>>(),
        vec![5, 5, 5, 5, 3]
    );
    assert_eq!(chunks[0].first(), chunks[0].rows.first());

    let mut joined = RowBatch::empty();
    for chunk in chunks {
        joined.append(chunk);
    }
    assert_eq!(values(&joined, "name"), names);
}

#[test]
fn test_chunk_size_zero_rejected() {
    assert!(generate_random_batch(3, 1).chunks(0).is_err());
}

#[test]
fn test_concat_empty_batches() {
    let mut batch = RowBatch::empty();
    batch.append(RowBatch::empty());
    assert!(batch.is_empty());
    assert!(batch.first().is_none());
    assert!(RowBatch::empty().chunks(4).expect("chunks").is_empty());
}

#[test]
fn test_estimated_bytes_grows_with_rows() {
    let small = generate_random_batch(10, 3);
    let large = generate_random_batch(100, 3);
    assert!(small.estimated_bytes() > 0);
    assert!(large.estimated_bytes() > small.estimated_bytes());
}
