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

//! Predicate filters: null counts, NaN counts and boolean masks

use std::sync::Arc;

use arrow::array::AsArray;

use super::copy_if::{copy_if, scratch};
use super::predicates;
use super::{key_columns, validate_threshold};
use crate::ctx::Stream;
use crate::error::{CompactionError, CompactionResult};
use crate::memory::{MemoryResource, Reservation};
use crate::table::{Column, Table};

/// Keep rows with at least `keep_threshold` non-null values among `keys`
pub fn drop_nulls(
    input: &Table,
    keys: &[usize],
    keep_threshold: usize,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    input.validate_column_indices(keys)?;
    validate_threshold(keep_threshold, keys.len())?;

    stream.launch("drop_nulls", || {
        let batch = input.combined_batch()?;
        let num_rows = batch.num_rows();
        let _decisions = scratch::<bool>(num_rows, stream, mr)?;
        let decisions = predicates::valid_count_decisions(
            &key_columns(&batch, keys),
            num_rows,
            keep_threshold,
            stream,
        );
        copy_if(&batch, &decisions, stream, mr)
    })
}

/// Keep rows with no null among `keys`
pub fn drop_any_nulls(
    input: &Table,
    keys: &[usize],
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    drop_nulls(input, keys, keys.len(), stream, mr)
}

/// Keep rows with at least `keep_threshold` non-NaN values among `keys`.
///
/// Only floating key columns can reject a row, and in them a null counts as
/// NaN.
pub fn drop_nans(
    input: &Table,
    keys: &[usize],
    keep_threshold: usize,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    input.validate_column_indices(keys)?;
    validate_threshold(keep_threshold, keys.len())?;

    stream.launch("drop_nans", || {
        let batch = input.combined_batch()?;
        let num_rows = batch.num_rows();
        let _decisions = scratch::<bool>(num_rows, stream, mr)?;
        let decisions = predicates::non_nan_count_decisions(
            &key_columns(&batch, keys),
            num_rows,
            keep_threshold,
            stream,
        );
        copy_if(&batch, &decisions, stream, mr)
    })
}

/// Keep rows with no NaN or null in any floating column among `keys`
pub fn drop_any_nans(
    input: &Table,
    keys: &[usize],
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    drop_nans(input, keys, keys.len(), stream, mr)
}

/// Keep rows where `mask` is valid and true
pub fn apply_boolean_mask(
    input: &Table,
    mask: &Column,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    let Some(mask) = mask.data().as_boolean_opt() else {
        return Err(CompactionError::TypeMismatch(format!(
            "boolean mask expected, found {}",
            mask.data_type()
        )));
    };
    if mask.len() != input.rows() {
        return Err(CompactionError::RowCountMismatch {
            expected: input.rows(),
            actual: mask.len(),
        });
    }

    stream.launch("apply_boolean_mask", || {
        let batch = input.combined_batch()?;
        let _decisions = scratch::<bool>(batch.num_rows(), stream, mr)?;
        let decisions = predicates::mask_decisions(mask, stream);
        copy_if(&batch, &decisions, stream, mr)
    })
}

/// Boolean column marking the NaN entries of a floating column; nulls stay null
pub fn is_nan(
    column: &Column,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Column> {
    if !column.is_floating() {
        return Err(CompactionError::TypeMismatch(format!(
            "is_nan needs a floating column, found {}",
            column.data_type()
        )));
    }

    stream.launch("is_nan", || {
        let _output = Reservation::try_new(mr, column.len().div_ceil(8), stream)?;
        let flags = predicates::nan_mask(column.data()).ok_or_else(|| {
            CompactionError::TypeMismatch(format!(
                "is_nan needs a floating column, found {}",
                column.data_type()
            ))
        })?;
        Ok(Column::new(Arc::new(flags)))
    })
}
