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

//! Tests for drop_nans, drop_any_nans and is_nan

use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Float32Array, Float64Array, Int32Array};
use arrow::datatypes::Int32Type;
use cylon_compaction::stream_compaction::detail;
use cylon_compaction::{
    drop_any_nans, drop_nans, is_nan, Column, CompactionConfig, CompactionError, FromVector,
    MemoryResource, Stream, SystemMemoryResource, Table,
};

fn ids(table: &Table, column: usize) -> Vec<Option<i32>> {
    let batch = table.combined_batch().unwrap();
    batch.column(column).as_primitive::<Int32Type>().iter().collect()
}

/// x: [1.0, NaN, null, 4.0], y: [1, null, 3, 4], id: [0, 1, 2, 3]
fn mixed_table() -> Table {
    Table::from_columns(vec![
        (
            "x",
            Arc::new(Float64Array::from(vec![Some(1.0), Some(f64::NAN), None, Some(4.0)]))
                as ArrayRef,
        ),
        ("y", Arc::new(Int32Array::from(vec![Some(1), None, Some(3), Some(4)])) as ArrayRef),
        ("id", Arc::new(Int32Array::from(vec![0, 1, 2, 3])) as ArrayRef),
    ])
    .unwrap()
}

#[test]
fn test_drop_nans_floating_key() {
    let table = mixed_table();

    // a null in a floating key fails just like NaN
    let result = drop_nans(&table, &[0], 1).unwrap();
    assert_eq!(ids(&result, 2), vec![Some(0), Some(3)]);
}

#[test]
fn test_drop_nans_non_floating_keys_keep_everything() {
    let table = mixed_table();

    let result = drop_nans(&table, &[1], 1).unwrap();
    assert_eq!(result.rows(), 4);

    let result = drop_any_nans(&table, &[1, 2]).unwrap();
    assert_eq!(result.rows(), 4);
}

#[test]
fn test_drop_nans_mixed_keys() {
    let table = mixed_table();

    // the integer key always counts as valid
    let result = drop_nans(&table, &[0, 1], 1).unwrap();
    assert_eq!(result.rows(), 4);

    let result = drop_nans(&table, &[0, 1], 2).unwrap();
    assert_eq!(ids(&result, 2), vec![Some(0), Some(3)]);

    let result = drop_any_nans(&table, &[0, 1]).unwrap();
    assert_eq!(ids(&result, 2), vec![Some(0), Some(3)]);
}

#[test]
fn test_drop_nans_float32() {
    let table = Table::from_columns(vec![
        (
            "x",
            Arc::new(Float32Array::from(vec![f32::NAN, 2.5, -f32::NAN, 0.0])) as ArrayRef,
        ),
        (
            "z",
            Arc::new(Float32Array::from(vec![1.0, f32::NAN, 3.0, 4.0])) as ArrayRef,
        ),
        ("id", Arc::new(Int32Array::from(vec![0, 1, 2, 3])) as ArrayRef),
    ])
    .unwrap();

    let result = drop_any_nans(&table, &[0]).unwrap();
    assert_eq!(ids(&result, 2), vec![Some(1), Some(3)]);

    let result = drop_any_nans(&table, &[0, 1]).unwrap();
    assert_eq!(ids(&result, 2), vec![Some(3)]);

    let result = drop_nans(&table, &[0, 1], 1).unwrap();
    assert_eq!(ids(&result, 2), vec![Some(0), Some(1), Some(2), Some(3)]);

    let result = drop_nans(&table, &[0, 1], 0).unwrap();
    assert_eq!(result.rows(), 4);
}

#[test]
fn test_drop_nans_invalid_arguments() {
    let table = mixed_table();

    assert!(matches!(
        drop_nans(&table, &[3], 1),
        Err(CompactionError::InvalidColumnIndex { index: 3, .. })
    ));
    assert!(matches!(
        drop_nans(&table, &[0], 2),
        Err(CompactionError::InvalidThreshold {
            threshold: 2,
            num_keys: 1
        })
    ));
}

#[test]
fn test_drop_nans_parallel_path() {
    let config = CompactionConfig::new()
        .with_parallel_threshold(32)
        .with_chunk_size(10)
        .with_num_threads(3);
    let stream = Stream::with_config("drop-nans-parallel", config).unwrap();
    let mr: Arc<dyn MemoryResource> = Arc::new(SystemMemoryResource::new());

    let values: Vec<f64> = (0..500)
        .map(|i| if i % 5 == 0 { f64::NAN } else { i as f64 })
        .collect();
    let id: Vec<i32> = (0..500).collect();
    let table = Table::from_columns(vec![
        ("x", Arc::new(Float64Array::from(values)) as ArrayRef),
        ("id", Arc::new(Int32Array::from(id)) as ArrayRef),
    ])
    .unwrap();

    let result = detail::drop_any_nans(&table, &[0], &stream, &mr).unwrap();

    let expected: Vec<Option<i32>> = (0..500).filter(|i| i % 5 != 0).map(Some).collect();
    assert_eq!(ids(&result, 1), expected);
}

#[test]
fn test_is_nan() {
    let column = Column::from_vector(&[Some(1.0f64), Some(f64::NAN), None, Some(-f64::NAN)]);

    let flags = is_nan(&column).unwrap();

    assert!(flags.is_boolean());
    let flags: Vec<Option<bool>> = flags.data().as_boolean().iter().collect();
    assert_eq!(flags, vec![Some(false), Some(true), None, Some(true)]);
}

#[test]
fn test_is_nan_rejects_non_floating() {
    let column = Column::from_vector(&[1i32, 2, 3]);

    match is_nan(&column) {
        Err(e @ CompactionError::TypeMismatch(_)) => assert!(e.is_validation_error()),
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
}
