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

//! Tests for drop_duplicates and unordered_drop_duplicates

use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Decimal128Array, Float64Array, Int32Array, StringArray};
use arrow::datatypes::Int32Type;
use cylon_compaction::stream_compaction::detail;
use cylon_compaction::{
    distinct_count_table, drop_duplicates, unordered_drop_duplicates, CompactionConfig,
    CompactionError, KeepOption, MemoryResource, NullEquality, NullOrder, Stream,
    SystemMemoryResource, Table,
};

fn int32_column(table: &Table, column: usize) -> Vec<Option<i32>> {
    let batch = table.combined_batch().unwrap();
    batch.column(column).as_primitive::<Int32Type>().iter().collect()
}

/// v: [1, 2, 2, null, null, 3], payload: [10, 20, 30, 40, 50, 60]
fn scenario_table() -> Table {
    Table::from_columns(vec![
        (
            "v",
            Arc::new(Int32Array::from(vec![Some(1), Some(2), Some(2), None, None, Some(3)]))
                as ArrayRef,
        ),
        (
            "payload",
            Arc::new(Int32Array::from(vec![10, 20, 30, 40, 50, 60])) as ArrayRef,
        ),
    ])
    .unwrap()
}

#[test]
fn test_drop_duplicates_keep_first() {
    let table = scenario_table();

    let result = drop_duplicates(
        &table,
        &[0],
        KeepOption::First,
        NullEquality::Equal,
        NullOrder::Before,
    )
    .unwrap();

    assert_eq!(int32_column(&result, 0), vec![Some(1), Some(2), None, Some(3)]);
    assert_eq!(
        int32_column(&result, 1),
        vec![Some(10), Some(20), Some(40), Some(60)]
    );
}

#[test]
fn test_drop_duplicates_keep_last() {
    let table = scenario_table();

    let result = drop_duplicates(
        &table,
        &[0],
        KeepOption::Last,
        NullEquality::Equal,
        NullOrder::After,
    )
    .unwrap();

    assert_eq!(
        int32_column(&result, 1),
        vec![Some(10), Some(30), Some(50), Some(60)]
    );
}

#[test]
fn test_drop_duplicates_keep_none() {
    let table = scenario_table();

    let result = drop_duplicates(
        &table,
        &[0],
        KeepOption::None,
        NullEquality::Equal,
        NullOrder::Before,
    )
    .unwrap();

    assert_eq!(int32_column(&result, 0), vec![Some(1), Some(3)]);
}

#[test]
fn test_drop_duplicates_nulls_unequal() {
    let table = scenario_table();

    for null_order in [NullOrder::Before, NullOrder::After] {
        let result = drop_duplicates(
            &table,
            &[0],
            KeepOption::First,
            NullEquality::Unequal,
            null_order,
        )
        .unwrap();
        assert_eq!(
            int32_column(&result, 1),
            vec![Some(10), Some(20), Some(40), Some(50), Some(60)]
        );
    }

    // every null row is unique, so none of them is dropped
    let result = drop_duplicates(
        &table,
        &[0],
        KeepOption::None,
        NullEquality::Unequal,
        NullOrder::Before,
    )
    .unwrap();
    assert_eq!(
        int32_column(&result, 1),
        vec![Some(10), Some(40), Some(50), Some(60)]
    );
}

#[test]
fn test_drop_duplicates_multiple_keys() {
    let table = Table::from_columns(vec![
        ("a", Arc::new(Int32Array::from(vec![1, 1, 2, 1, 2])) as ArrayRef),
        (
            "b",
            Arc::new(StringArray::from(vec!["x", "y", "x", "x", "x"])) as ArrayRef,
        ),
        ("id", Arc::new(Int32Array::from(vec![0, 1, 2, 3, 4])) as ArrayRef),
    ])
    .unwrap();

    let first = drop_duplicates(
        &table,
        &[1, 0],
        KeepOption::First,
        NullEquality::Equal,
        NullOrder::Before,
    )
    .unwrap();
    assert_eq!(int32_column(&first, 2), vec![Some(0), Some(1), Some(2)]);

    let last = drop_duplicates(
        &table,
        &[0, 1],
        KeepOption::Last,
        NullEquality::Equal,
        NullOrder::Before,
    )
    .unwrap();
    assert_eq!(int32_column(&last, 2), vec![Some(1), Some(3), Some(4)]);
}

#[test]
fn test_drop_duplicates_nan_and_signed_zero() {
    let table = Table::from_columns(vec![
        (
            "x",
            Arc::new(Float64Array::from(vec![0.0, -0.0, f64::NAN, -f64::NAN, 1.0])) as ArrayRef,
        ),
        ("id", Arc::new(Int32Array::from(vec![0, 1, 2, 3, 4])) as ArrayRef),
    ])
    .unwrap();

    let result = drop_duplicates(
        &table,
        &[0],
        KeepOption::First,
        NullEquality::Equal,
        NullOrder::Before,
    )
    .unwrap();
    assert_eq!(int32_column(&result, 1), vec![Some(0), Some(2), Some(4)]);

    let result = unordered_drop_duplicates(&table, &[0], NullEquality::Equal).unwrap();
    assert_eq!(result.rows(), 3);
}

#[test]
fn test_drop_duplicates_invalid_arguments() {
    let table = scenario_table();

    assert!(matches!(
        drop_duplicates(
            &table,
            &[2],
            KeepOption::First,
            NullEquality::Equal,
            NullOrder::Before
        ),
        Err(CompactionError::InvalidColumnIndex { index: 2, .. })
    ));
    assert!(matches!(
        unordered_drop_duplicates(&table, &[0, 5], NullEquality::Equal),
        Err(CompactionError::InvalidColumnIndex { index: 5, .. })
    ));

    let decimals = Table::from_columns(vec![(
        "d",
        Arc::new(Decimal128Array::from(vec![1i128, 1, 2])) as ArrayRef,
    )])
    .unwrap();
    assert!(matches!(
        unordered_drop_duplicates(&decimals, &[0], NullEquality::Equal),
        Err(CompactionError::TypeMismatch(_))
    ));
}

#[test]
fn test_unordered_drop_duplicates() {
    let table = scenario_table();

    let result = unordered_drop_duplicates(&table, &[0], NullEquality::Equal).unwrap();

    let mut values = int32_column(&result, 0);
    values.sort();
    assert_eq!(values, vec![None, Some(1), Some(2), Some(3)]);

    let projected = table.project(&[0]).unwrap();
    assert_eq!(
        result.rows(),
        distinct_count_table(&projected, NullEquality::Equal).unwrap()
    );

    let result = unordered_drop_duplicates(&table, &[0], NullEquality::Unequal).unwrap();
    assert_eq!(result.rows(), 5);
}

#[test]
fn test_drop_duplicates_parallel_path() {
    let config = CompactionConfig::new()
        .with_parallel_threshold(64)
        .with_chunk_size(100)
        .with_num_threads(4);
    let stream = Stream::with_config("dedupe-parallel", config).unwrap();
    let mr: Arc<dyn MemoryResource> = Arc::new(SystemMemoryResource::new());

    let keys: Vec<i32> = (0..5000).map(|i| i % 97).collect();
    let rows: Vec<i32> = (0..5000).collect();
    let table = Table::from_columns(vec![
        ("k", Arc::new(Int32Array::from(keys)) as ArrayRef),
        ("row", Arc::new(Int32Array::from(rows)) as ArrayRef),
    ])
    .unwrap();

    let first = detail::drop_duplicates(
        &table,
        &[0],
        KeepOption::First,
        NullEquality::Equal,
        NullOrder::Before,
        &stream,
        &mr,
    )
    .unwrap();
    let expected: Vec<Option<i32>> = (0..97).map(Some).collect();
    assert_eq!(int32_column(&first, 1), expected);

    let last = detail::drop_duplicates(
        &table,
        &[0],
        KeepOption::Last,
        NullEquality::Equal,
        NullOrder::Before,
        &stream,
        &mr,
    )
    .unwrap();
    let expected: Vec<Option<i32>> = (4903..5000).map(Some).collect();
    assert_eq!(int32_column(&last, 1), expected);

    let unordered =
        detail::unordered_drop_duplicates(&table, &[0], NullEquality::Equal, &stream, &mr)
            .unwrap();
    let mut keys = int32_column(&unordered, 0);
    keys.sort();
    let expected: Vec<Option<i32>> = (0..97).map(Some).collect();
    assert_eq!(keys, expected);
}
