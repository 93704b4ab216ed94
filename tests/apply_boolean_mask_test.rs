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

//! Tests for apply_boolean_mask and Table::select

use std::sync::Arc;

use arrow::array::{
    ArrayRef, AsArray, BooleanArray, Int32Array, RecordBatch, RecordBatchOptions, StringArray,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use cylon_compaction::stream_compaction::detail;
use cylon_compaction::{
    apply_boolean_mask, Column, CompactionConfig, CompactionError, FromVector, MemoryResource,
    Stream, SystemMemoryResource, Table,
};

fn people() -> Table {
    Table::from_columns(vec![
        ("id", Arc::new(Int32Array::from(vec![1, 2, 3, 4, 5])) as ArrayRef),
        (
            "name",
            Arc::new(StringArray::from(vec!["A", "B", "C", "D", "E"])) as ArrayRef,
        ),
    ])
    .unwrap()
}

fn ids(table: &Table) -> Vec<i32> {
    let batch = table.combined_batch().unwrap();
    batch
        .column(0)
        .as_primitive::<Int32Type>()
        .values()
        .to_vec()
}

#[test]
fn test_apply_boolean_mask() {
    let table = people();
    let mask = Column::from_vector(&[Some(true), None, Some(false), Some(true), Some(true)]);

    let result = apply_boolean_mask(&table, &mask).unwrap();

    assert_eq!(result.rows(), 3);
    assert_eq!(ids(&result), vec![1, 4, 5]);
    let batch = result.combined_batch().unwrap();
    let names: Vec<&str> = batch.column(1).as_string::<i32>().iter().flatten().collect();
    assert_eq!(names, vec!["A", "D", "E"]);
}

#[test]
fn test_apply_boolean_mask_all_and_none() {
    let table = people();

    let none = apply_boolean_mask(&table, &Column::from_vector(&[false; 5])).unwrap();
    assert_eq!(none.rows(), 0);
    assert_eq!(none.columns(), 2);
    assert_eq!(none.schema(), table.schema());

    let all = apply_boolean_mask(&table, &Column::from_vector(&[true; 5])).unwrap();
    assert_eq!(ids(&all), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_table_select() {
    let table = people();
    let mask = BooleanArray::from(vec![false, true, false, true, false]);

    let result = table.select(&mask).unwrap();

    assert_eq!(ids(&result), vec![2, 4]);
}

#[test]
fn test_apply_boolean_mask_row_count_mismatch() {
    let table = people();
    let mask = Column::from_vector(&[true, false, true]);

    match apply_boolean_mask(&table, &mask) {
        Err(CompactionError::RowCountMismatch { expected, actual }) => {
            assert_eq!(expected, 5);
            assert_eq!(actual, 3);
        }
        other => panic!("expected RowCountMismatch, got {:?}", other),
    }
}

#[test]
fn test_apply_boolean_mask_requires_boolean() {
    let table = people();
    let mask = Column::from_vector(&[1i32, 0, 1, 0, 1]);

    assert!(matches!(
        apply_boolean_mask(&table, &mask),
        Err(CompactionError::TypeMismatch(_))
    ));
}

#[test]
fn test_apply_boolean_mask_multi_batch() {
    let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int32, false)]));
    let batches = vec![
        RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(vec![1, 2]))])
            .unwrap(),
        RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(vec![3, 4, 5]))])
            .unwrap(),
    ];
    let table = Table::try_new(schema, batches).unwrap();
    let mask = Column::from_vector(&[false, true, true, false, true]);

    let result = apply_boolean_mask(&table, &mask).unwrap();

    assert_eq!(ids(&result), vec![2, 3, 5]);
}

#[test]
fn test_apply_boolean_mask_zero_columns() {
    let options = RecordBatchOptions::new().with_row_count(Some(4));
    let batch =
        RecordBatch::try_new_with_options(Arc::new(Schema::empty()), vec![], &options).unwrap();
    let table = Table::from_record_batch(batch).unwrap();
    let mask = Column::from_vector(&[true, false, true, false]);

    let result = apply_boolean_mask(&table, &mask).unwrap();

    assert_eq!(result.columns(), 0);
    assert_eq!(result.rows(), 2);
}

#[test]
fn test_apply_boolean_mask_parallel_path() {
    let config = CompactionConfig::new()
        .with_parallel_threshold(64)
        .with_chunk_size(13)
        .with_num_threads(4);
    let stream = Stream::with_config("mask-parallel", config).unwrap();
    let mr: Arc<dyn MemoryResource> = Arc::new(SystemMemoryResource::new());

    let values: Vec<i32> = (0..2000).collect();
    let table = Table::from_columns(vec![("id", Arc::new(Int32Array::from(values)) as ArrayRef)])
        .unwrap();
    let flags: Vec<Option<bool>> = (0..2000)
        .map(|i| match i % 4 {
            0 => Some(true),
            1 => None,
            2 => Some(false),
            _ => Some(i % 8 == 3),
        })
        .collect();
    let mask = Column::from_vector(&flags);

    let result = detail::apply_boolean_mask(&table, &mask, &stream, &mr).unwrap();

    let expected: Vec<i32> = (0..2000).filter(|i| i % 4 == 0 || i % 8 == 3).collect();
    assert_eq!(ids(&result), expected);
}
