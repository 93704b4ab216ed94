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

//! Distinct value and row counts
//!
//! Column counts handle the null and NaN groups apart from the ordinary
//! values: only rows that are neither null nor NaN go through the engines,
//! and the special groups are added back per [`NullHandling`] and
//! [`NanHandling`].

use std::sync::Arc;

use arrow::array::{Array, ArrayRef};

use super::copy_if::scratch;
use super::policy::{NanHandling, NullEquality, NullHandling, NullOrder};
use super::predicates::{nan_positions, plain_value_rows};
use super::validate_key_types;
use super::{hash_distinct, sort_distinct};
use crate::arrow::{is_supported_key_type, RowComparator, RowHasher};
use crate::ctx::Stream;
use crate::error::{CompactionError, CompactionResult};
use crate::memory::MemoryResource;
use crate::table::{Column, Table};

/// Null and NaN presence in a column
#[derive(Debug, Clone, Copy)]
struct SpecialGroups {
    has_null: bool,
    has_nan: bool,
}

impl SpecialGroups {
    /// Classes contributed by nulls and NaNs under the given policies
    fn count(&self, null_handling: NullHandling, nan_handling: NanHandling) -> usize {
        let (nan_group, null_group) = match nan_handling {
            NanHandling::NanIsValue => (self.has_nan, self.has_null),
            NanHandling::NanIsNull => (false, self.has_null || self.has_nan),
        };
        let null_group = null_handling == NullHandling::Include && null_group;
        usize::from(nan_group) + usize::from(null_group)
    }
}

/// Rows holding an ordinary value, and which special groups are present
fn split_column(values: &ArrayRef) -> (Vec<usize>, SpecialGroups) {
    let nans = nan_positions(values);
    let groups = SpecialGroups {
        has_null: values.null_count() > 0,
        has_nan: nans.as_ref().map_or(false, |bits| bits.count_set_bits() > 0),
    };
    (plain_value_rows(values, &nans), groups)
}

fn validate_column_type(column: &Column) -> CompactionResult<()> {
    if is_supported_key_type(column.data_type()) {
        Ok(())
    } else {
        Err(CompactionError::TypeMismatch(format!(
            "unsupported column type {}",
            column.data_type()
        )))
    }
}

fn table_comparator(
    input: &Table,
    nulls_equal: NullEquality,
) -> CompactionResult<(Vec<ArrayRef>, RowComparator)> {
    let batch = input.combined_batch()?;
    let columns = batch.columns().to_vec();
    let comparator = RowComparator::for_columns(&columns, nulls_equal, NullOrder::default())?;
    Ok((columns, comparator))
}

fn all_columns(input: &Table) -> Vec<usize> {
    (0..input.columns()).collect()
}

/// Number of distinct values in `column`, counted by sorting
pub fn distinct_count(
    column: &Column,
    null_handling: NullHandling,
    nan_handling: NanHandling,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<usize> {
    validate_column_type(column)?;

    stream.launch("distinct_count", || {
        let values = column.data();
        let (rows, groups) = split_column(values);
        let _sorted = scratch::<usize>(rows.len(), stream, mr)?;

        let comparator = RowComparator::for_columns(
            std::slice::from_ref(values),
            NullEquality::Equal,
            NullOrder::default(),
        )?;
        let distinct = sort_distinct::count_classes(&comparator, rows, stream);
        let total = distinct + groups.count(null_handling, nan_handling);
        compaction_debug!("distinct_count: {} values, {:?}", total, groups);
        Ok(total)
    })
}

/// Number of distinct values in `column`, counted by hashing
pub fn unordered_distinct_count(
    column: &Column,
    null_handling: NullHandling,
    nan_handling: NanHandling,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<usize> {
    validate_column_type(column)?;

    stream.launch("unordered_distinct_count", || {
        let values = column.data();
        let (rows, groups) = split_column(values);
        let _hashes = scratch::<u64>(values.len(), stream, mr)?;
        let _slots = scratch::<usize>(rows.len(), stream, mr)?;

        let key = std::slice::from_ref(values);
        let comparator = RowComparator::for_columns(key, NullEquality::Equal, NullOrder::default())?;
        let hasher = RowHasher::try_new(key, values.len(), stream)?;
        let distinct =
            hash_distinct::representatives(&comparator, &hasher, &rows, NullEquality::Equal, stream)
                .len();
        let total = distinct + groups.count(null_handling, nan_handling);
        compaction_debug!("unordered_distinct_count: {} values, {:?}", total, groups);
        Ok(total)
    })
}

/// Number of distinct rows in `input`, counted by sorting
pub fn distinct_count_table(
    input: &Table,
    nulls_equal: NullEquality,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<usize> {
    validate_key_types(input, &all_columns(input))?;

    stream.launch("distinct_count_table", || {
        let num_rows = input.rows();
        let (_, comparator) = table_comparator(input, nulls_equal)?;
        let _sorted = scratch::<usize>(num_rows, stream, mr)?;
        Ok(sort_distinct::count_classes(
            &comparator,
            (0..num_rows).collect(),
            stream,
        ))
    })
}

/// Number of distinct rows in `input`, counted by hashing
pub fn unordered_distinct_count_table(
    input: &Table,
    nulls_equal: NullEquality,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<usize> {
    validate_key_types(input, &all_columns(input))?;

    stream.launch("unordered_distinct_count_table", || {
        let num_rows = input.rows();
        let (columns, comparator) = table_comparator(input, nulls_equal)?;
        let _hashes = scratch::<u64>(num_rows, stream, mr)?;
        let _slots = scratch::<usize>(2 * num_rows, stream, mr)?;

        let hasher = RowHasher::try_new(&columns, num_rows, stream)?;
        let rows: Vec<usize> = (0..num_rows).collect();
        Ok(hash_distinct::representatives(&comparator, &hasher, &rows, nulls_equal, stream).len())
    })
}
