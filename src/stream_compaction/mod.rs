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

//! Stream compaction operations
//!
//! Row filtering, duplicate removal and distinct counting over [`Table`]s.
//! The functions at this level run on the process-wide default [`Stream`](crate::ctx::Stream) and
//! memory resource; [`detail`] takes both explicitly.
//!
//! ```ignore
//! let table = Table::from_columns(vec![("a", column)])?;
//! let dense = drop_any_nulls(&table, &[0])?;
//! let unique = drop_duplicates(&dense, &[0], KeepOption::First, NullEquality::Equal, NullOrder::Before)?;
//! ```

use arrow::array::{ArrayRef, RecordBatch};

use crate::arrow::is_supported_key_type;
use crate::ctx::default_stream;
use crate::error::{CompactionError, CompactionResult};
use crate::memory::current_memory_resource;
use crate::table::{Column, Table};

mod copy_if;
mod distinct_count;
mod duplicates;
mod filter;
mod hash_distinct;
pub mod policy;
mod predicates;
mod sort_distinct;

pub use policy::{KeepOption, NanHandling, NullEquality, NullHandling, NullOrder};

/// Operations on an explicit stream and memory resource
pub mod detail {
    pub use super::distinct_count::{
        distinct_count, distinct_count_table, unordered_distinct_count,
        unordered_distinct_count_table,
    };
    pub use super::duplicates::{drop_duplicates, unordered_drop_duplicates};
    pub use super::filter::{
        apply_boolean_mask, drop_any_nans, drop_any_nulls, drop_nans, drop_nulls, is_nan,
    };
}

pub(crate) fn validate_threshold(keep_threshold: usize, num_keys: usize) -> CompactionResult<()> {
    if keep_threshold > num_keys {
        return Err(CompactionError::InvalidThreshold {
            threshold: keep_threshold,
            num_keys,
        });
    }
    Ok(())
}

pub(crate) fn validate_key_types(input: &Table, keys: &[usize]) -> CompactionResult<()> {
    let schema = input.schema();
    for &key in keys {
        let data_type = schema.field(key).data_type();
        if !is_supported_key_type(data_type) {
            return Err(CompactionError::TypeMismatch(format!(
                "key column {} has unsupported type {}",
                key, data_type
            )));
        }
    }
    Ok(())
}

pub(crate) fn key_columns(batch: &RecordBatch, keys: &[usize]) -> Vec<ArrayRef> {
    keys.iter().map(|&key| batch.column(key).clone()).collect()
}

/// Keep rows with at least `keep_threshold` non-null values among `keys`
pub fn drop_nulls(input: &Table, keys: &[usize], keep_threshold: usize) -> CompactionResult<Table> {
    detail::drop_nulls(input, keys, keep_threshold, &default_stream(), &current_memory_resource())
}

/// Keep rows with no null among `keys`
pub fn drop_any_nulls(input: &Table, keys: &[usize]) -> CompactionResult<Table> {
    detail::drop_any_nulls(input, keys, &default_stream(), &current_memory_resource())
}

/// Keep rows with at least `keep_threshold` non-NaN values among `keys`
pub fn drop_nans(input: &Table, keys: &[usize], keep_threshold: usize) -> CompactionResult<Table> {
    detail::drop_nans(input, keys, keep_threshold, &default_stream(), &current_memory_resource())
}

/// Keep rows with no NaN (or null) in the floating columns among `keys`
pub fn drop_any_nans(input: &Table, keys: &[usize]) -> CompactionResult<Table> {
    detail::drop_any_nans(input, keys, &default_stream(), &current_memory_resource())
}

/// Keep rows where `mask` is valid and true
pub fn apply_boolean_mask(input: &Table, mask: &Column) -> CompactionResult<Table> {
    detail::apply_boolean_mask(input, mask, &default_stream(), &current_memory_resource())
}

/// Boolean column marking NaN entries of a floating column
pub fn is_nan(column: &Column) -> CompactionResult<Column> {
    detail::is_nan(column, &default_stream(), &current_memory_resource())
}

/// Keep one row (or none) per class of equal `keys`, in input order
pub fn drop_duplicates(
    input: &Table,
    keys: &[usize],
    keep: KeepOption,
    nulls_equal: NullEquality,
    null_order: NullOrder,
) -> CompactionResult<Table> {
    detail::drop_duplicates(
        input,
        keys,
        keep,
        nulls_equal,
        null_order,
        &default_stream(),
        &current_memory_resource(),
    )
}

/// Keep one row per class of equal `keys`, in no particular order
pub fn unordered_drop_duplicates(
    input: &Table,
    keys: &[usize],
    nulls_equal: NullEquality,
) -> CompactionResult<Table> {
    detail::unordered_drop_duplicates(input, keys, nulls_equal, &default_stream(), &current_memory_resource())
}

/// Number of distinct values in `column`, counted by sorting
pub fn distinct_count(
    column: &Column,
    null_handling: NullHandling,
    nan_handling: NanHandling,
) -> CompactionResult<usize> {
    detail::distinct_count(
        column,
        null_handling,
        nan_handling,
        &default_stream(),
        &current_memory_resource(),
    )
}

/// Number of distinct rows in `input`, counted by sorting
pub fn distinct_count_table(input: &Table, nulls_equal: NullEquality) -> CompactionResult<usize> {
    detail::distinct_count_table(input, nulls_equal, &default_stream(), &current_memory_resource())
}

/// Number of distinct values in `column`, counted by hashing
pub fn unordered_distinct_count(
    column: &Column,
    null_handling: NullHandling,
    nan_handling: NanHandling,
) -> CompactionResult<usize> {
    detail::unordered_distinct_count(
        column,
        null_handling,
        nan_handling,
        &default_stream(),
        &current_memory_resource(),
    )
}

/// Number of distinct rows in `input`, counted by hashing
pub fn unordered_distinct_count_table(
    input: &Table,
    nulls_equal: NullEquality,
) -> CompactionResult<usize> {
    detail::unordered_distinct_count_table(input, nulls_equal, &default_stream(), &current_memory_resource())
}
