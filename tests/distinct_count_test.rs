// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tests for the distinct counting operations

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, ListArray, StringArray};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use cylon_compaction::stream_compaction::detail;
use cylon_compaction::{
    distinct_count, distinct_count_table, unordered_distinct_count,
    unordered_distinct_count_table, unordered_drop_duplicates, Column, CompactionConfig,
    CompactionError, FromVector, MemoryResource, NanHandling, NullEquality, NullHandling, Stream,
    SystemMemoryResource, Table,
};

fn both_counts(column: &Column, nulls: NullHandling, nans: NanHandling) -> usize {
    let sorted = distinct_count(column, nulls, nans).unwrap();
    let hashed = unordered_distinct_count(column, nulls, nans).unwrap();
    assert_eq!(sorted, hashed, "sort and hash counts differ");
    sorted
}

#[test]
fn test_distinct_count_with_nulls() {
    let column = Column::from_vector(&[Some(1i32), Some(2), Some(2), None, None, Some(3)]);

    assert_eq!(
        both_counts(&column, NullHandling::Exclude, NanHandling::NanIsValue),
        3
    );
    assert_eq!(
        both_counts(&column, NullHandling::Include, NanHandling::NanIsValue),
        4
    );
}

#[test]
fn test_distinct_count_nan_handling() {
    let column = Column::from_vector(&[
        Some(1.0f64),
        Some(f64::NAN),
        Some(f64::NAN),
        None,
        Some(2.0),
        Some(-0.0),
        Some(0.0),
    ]);

    assert_eq!(
        both_counts(&column, NullHandling::Exclude, NanHandling::NanIsValue),
        4
    );
    assert_eq!(
        both_counts(&column, NullHandling::Include, NanHandling::NanIsValue),
        5
    );
    assert_eq!(
        both_counts(&column, NullHandling::Exclude, NanHandling::NanIsNull),
        3
    );
    assert_eq!(
        both_counts(&column, NullHandling::Include, NanHandling::NanIsNull),
        4
    );
}

#[test]
fn test_distinct_count_nan_as_null_without_nulls() {
    let column = Column::from_vector(&[1.0f64, f64::NAN, 1.0]);

    assert_eq!(
        both_counts(&column, NullHandling::Include, NanHandling::NanIsNull),
        2
    );
    assert_eq!(
        both_counts(&column, NullHandling::Exclude, NanHandling::NanIsNull),
        1
    );
}

#[test]
fn test_distinct_count_strings() {
    let column = Column::from_vector(&[Some("a"), Some("b"), None, Some("a"), Some("")]);

    assert_eq!(
        both_counts(&column, NullHandling::Exclude, NanHandling::NanIsValue),
        3
    );
    assert_eq!(
        both_counts(&column, NullHandling::Include, NanHandling::NanIsNull),
        4
    );
}

#[test]
fn test_distinct_count_empty_column() {
    let column = Column::from_vector(&Vec::<i64>::new());

    assert_eq!(
        both_counts(&column, NullHandling::Include, NanHandling::NanIsValue),
        0
    );
}

#[test]
fn test_distinct_count_unsupported_type() {
    let list = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
        Some(vec![Some(1), Some(2)]),
        Some(vec![Some(3)]),
    ]);
    let column = Column::new(Arc::new(list));

    assert!(matches!(
        distinct_count(&column, NullHandling::Exclude, NanHandling::NanIsValue),
        Err(CompactionError::TypeMismatch(_))
    ));
    assert!(matches!(
        unordered_distinct_count(&column, NullHandling::Exclude, NanHandling::NanIsValue),
        Err(CompactionError::TypeMismatch(_))
    ));
}

#[test]
fn test_distinct_count_table() {
    let table = Table::from_columns(vec![
        (
            "a",
            Arc::new(Int32Array::from(vec![Some(1), Some(1), Some(2), None, None])) as ArrayRef,
        ),
        (
            "b",
            Arc::new(StringArray::from(vec![Some("x"), Some("x"), Some("y"), None, None]))
                as ArrayRef,
        ),
    ])
    .unwrap();

    assert_eq!(distinct_count_table(&table, NullEquality::Equal).unwrap(), 3);
    assert_eq!(
        unordered_distinct_count_table(&table, NullEquality::Equal).unwrap(),
        3
    );

    // each row holding a null is its own class
    assert_eq!(distinct_count_table(&table, NullEquality::Unequal).unwrap(), 4);
    assert_eq!(
        unordered_distinct_count_table(&table, NullEquality::Unequal).unwrap(),
        4
    );
}

#[test]
fn test_distinct_count_table_nans_always_equal() {
    let table = Table::from_columns(vec![(
        "x",
        Arc::new(Float64Array::from(vec![f64::NAN, f64::NAN, 1.0])) as ArrayRef,
    )])
    .unwrap();

    for nulls_equal in [NullEquality::Equal, NullEquality::Unequal] {
        assert_eq!(distinct_count_table(&table, nulls_equal).unwrap(), 2);
        assert_eq!(unordered_distinct_count_table(&table, nulls_equal).unwrap(), 2);
    }
}

#[test]
fn test_distinct_count_empty_table() {
    let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int32, true)]));
    let table = Table::empty(schema);

    assert_eq!(distinct_count_table(&table, NullEquality::Equal).unwrap(), 0);
    assert_eq!(
        unordered_distinct_count_table(&table, NullEquality::Equal).unwrap(),
        0
    );
}

#[test]
fn test_distinct_count_matches_unordered_drop_duplicates() {
    let table = Table::from_columns(vec![
        (
            "a",
            Arc::new(Int32Array::from(vec![Some(3), None, Some(3), Some(1), None, Some(1)]))
                as ArrayRef,
        ),
        (
            "b",
            Arc::new(Float64Array::from(vec![1.5, 2.5, 1.5, f64::NAN, 2.5, f64::NAN]))
                as ArrayRef,
        ),
    ])
    .unwrap();

    let deduped = unordered_drop_duplicates(&table, &[0, 1], NullEquality::Equal).unwrap();

    assert_eq!(deduped.rows(), 3);
    assert_eq!(
        distinct_count_table(&table, NullEquality::Equal).unwrap(),
        deduped.rows()
    );
}

#[test]
fn test_distinct_count_parallel_path() {
    let config = CompactionConfig::new()
        .with_parallel_threshold(128)
        .with_chunk_size(50)
        .with_num_threads(4);
    let stream = Stream::with_config("distinct-parallel", config).unwrap();
    let mr: Arc<dyn MemoryResource> = Arc::new(SystemMemoryResource::new());

    // deterministic pseudo-random values in [0, 500) with some nulls
    let mut state: u64 = 42;
    let values: Vec<Option<i32>> = (0..10_000)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let v = ((state >> 33) % 520) as i32;
            if v >= 500 {
                None
            } else {
                Some(v)
            }
        })
        .collect();
    let mut expected: Vec<i32> = values.iter().flatten().copied().collect();
    expected.sort_unstable();
    expected.dedup();

    let column = Column::from_vector(&values);
    let sorted = detail::distinct_count(
        &column,
        NullHandling::Exclude,
        NanHandling::NanIsValue,
        &stream,
        &mr,
    )
    .unwrap();
    let hashed = detail::unordered_distinct_count(
        &column,
        NullHandling::Exclude,
        NanHandling::NanIsValue,
        &stream,
        &mr,
    )
    .unwrap();

    assert_eq!(sorted, expected.len());
    assert_eq!(hashed, expected.len());
    assert_eq!(mr.allocated_bytes(), 0);

    let table = Table::from_columns(vec![("v", column.data().clone())]).unwrap();
    let with_null_group = expected.len() + usize::from(values.iter().any(|v| v.is_none()));
    assert_eq!(
        detail::distinct_count_table(&table, NullEquality::Equal, &stream, &mr).unwrap(),
        with_null_group
    );
    assert_eq!(
        detail::unordered_distinct_count_table(&table, NullEquality::Equal, &stream, &mr)
            .unwrap(),
        with_null_group
    );
}
