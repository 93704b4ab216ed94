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

//! Per-row keep decisions

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray};
use arrow::buffer::BooleanBuffer;
use arrow::datatypes::{ArrowPrimitiveType, DataType, Float16Type, Float32Type, Float64Type};
use rayon::prelude::*;

use crate::arrow::is_nan_value;
use crate::ctx::Stream;

/// Rows holding a valid NaN, `None` for columns that cannot hold NaN
pub(crate) fn nan_positions(column: &ArrayRef) -> Option<BooleanBuffer> {
    match column.data_type() {
        DataType::Float16 => nan_positions_typed::<Float16Type>(column),
        DataType::Float32 => nan_positions_typed::<Float32Type>(column),
        DataType::Float64 => nan_positions_typed::<Float64Type>(column),
        _ => None,
    }
}

fn nan_positions_typed<T: ArrowPrimitiveType>(column: &ArrayRef) -> Option<BooleanBuffer> {
    let array = column.as_primitive_opt::<T>()?;
    let values = array.values();
    Some(BooleanBuffer::collect_bool(array.len(), |i| {
        array.is_valid(i) && is_nan_value(&values[i])
    }))
}

/// NaN flags for a floating column, preserving its nulls
pub(crate) fn nan_mask(column: &ArrayRef) -> Option<BooleanArray> {
    let positions = nan_positions(column)?;
    Some(BooleanArray::new(positions, column.nulls().cloned()))
}

/// Keep a row when at least `keep_threshold` of the key validities hold.
///
/// A `None` validity counts as valid for every row.
fn threshold_decisions(
    validity: &[Option<BooleanBuffer>],
    num_rows: usize,
    keep_threshold: usize,
    stream: &Stream,
) -> Vec<bool> {
    let mut decisions = vec![false; num_rows];
    let chunk_len = stream.config().chunk_len(num_rows);
    decisions
        .par_chunks_mut(chunk_len)
        .enumerate()
        .for_each(|(chunk, out)| {
            let base = chunk * chunk_len;
            for (i, decision) in out.iter_mut().enumerate() {
                let row = base + i;
                let valid = validity
                    .iter()
                    .filter(|v| v.as_ref().map_or(true, |bits| bits.value(row)))
                    .count();
                *decision = valid >= keep_threshold;
            }
        });
    decisions
}

/// Decisions for dropping rows with too many null keys
pub(crate) fn valid_count_decisions(
    keys: &[ArrayRef],
    num_rows: usize,
    keep_threshold: usize,
    stream: &Stream,
) -> Vec<bool> {
    let validity: Vec<Option<BooleanBuffer>> = keys
        .iter()
        .map(|column| column.nulls().map(|nulls| nulls.inner().clone()))
        .collect();
    threshold_decisions(&validity, num_rows, keep_threshold, stream)
}

/// Decisions for dropping rows with too many NaN keys.
///
/// In a floating key column both NaN and null count as invalid; other key
/// columns are always valid.
pub(crate) fn non_nan_count_decisions(
    keys: &[ArrayRef],
    num_rows: usize,
    keep_threshold: usize,
    stream: &Stream,
) -> Vec<bool> {
    let validity: Vec<Option<BooleanBuffer>> = keys
        .iter()
        .map(|column| {
            nan_positions(column).map(|nans| {
                BooleanBuffer::collect_bool(num_rows, |row| column.is_valid(row) && !nans.value(row))
            })
        })
        .collect();
    threshold_decisions(&validity, num_rows, keep_threshold, stream)
}

/// Keep rows whose mask entry is valid and true
pub(crate) fn mask_decisions(mask: &BooleanArray, stream: &Stream) -> Vec<bool> {
    let num_rows = mask.len();
    let mut decisions = vec![false; num_rows];
    let chunk_len = stream.config().chunk_len(num_rows);
    decisions
        .par_chunks_mut(chunk_len)
        .enumerate()
        .for_each(|(chunk, out)| {
            let base = chunk * chunk_len;
            for (i, decision) in out.iter_mut().enumerate() {
                let row = base + i;
                *decision = mask.is_valid(row) && mask.value(row);
            }
        });
    decisions
}

/// Whether row `row` of a column is a valid NaN
#[inline]
pub(crate) fn is_nan_at(nans: &Option<BooleanBuffer>, row: usize) -> bool {
    nans.as_ref().map_or(false, |bits| bits.value(row))
}

/// Rows of `column` that are neither null nor NaN, in order
pub(crate) fn plain_value_rows(column: &ArrayRef, nans: &Option<BooleanBuffer>) -> Vec<usize> {
    (0..column.len())
        .into_par_iter()
        .filter(|&row| column.is_valid(row) && !is_nan_at(nans, row))
        .collect()
}
