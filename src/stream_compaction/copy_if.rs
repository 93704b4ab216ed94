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

//! Order-preserving compaction of a table by per-row keep decisions.
//!
//! Compaction runs in two phases. The first counts kept rows per chunk and
//! turns the counts into destination offsets; its total is the output row
//! count, which is requested from the memory resource before anything is
//! written. The second phase writes each chunk's kept row indices into its
//! own slice of the gather map, then gathers every column through that map.

use std::mem::size_of;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch, RecordBatchOptions, UInt64Array};
use arrow::compute::take;
use arrow::datatypes::{
    ArrowNativeType, BinaryType, ByteArrayType, DataType, LargeBinaryType, LargeUtf8Type, Utf8Type,
};
use rayon::prelude::*;

use crate::ctx::Stream;
use crate::error::CompactionResult;
use crate::memory::{MemoryResource, Reservation};
use crate::table::Table;

/// Destination layout of the kept rows, computed by [`CompactionPlan::scan`]
#[derive(Debug)]
pub(crate) struct CompactionPlan {
    chunk_len: usize,
    /// exclusive prefix sum of the per-chunk kept counts
    chunk_offsets: Vec<usize>,
    output_size: usize,
}

impl CompactionPlan {
    /// Count kept rows per chunk in parallel and scan the counts into offsets
    pub(crate) fn scan(decisions: &[bool], stream: &Stream) -> Self {
        let chunk_len = stream.config().chunk_len(decisions.len());
        let counts: Vec<usize> = decisions
            .par_chunks(chunk_len)
            .map(|chunk| chunk.iter().filter(|&&keep| keep).count())
            .collect();

        let mut chunk_offsets = Vec::with_capacity(counts.len());
        let mut running = 0;
        for count in counts {
            chunk_offsets.push(running);
            running += count;
        }

        compaction_trace!(
            "scanned {} rows in {} chunks of {}",
            decisions.len(),
            chunk_offsets.len(),
            chunk_len
        );

        Self {
            chunk_len,
            chunk_offsets,
            output_size: running,
        }
    }

    /// Number of kept rows
    pub(crate) fn compute_output_size(&self) -> usize {
        self.output_size
    }

    /// Kept row indices in original order, each chunk filling its own slice
    fn fill_gather_map(&self, decisions: &[bool]) -> Vec<u64> {
        let mut gather_map = vec![0u64; self.output_size];

        let mut slices = Vec::with_capacity(self.chunk_offsets.len());
        let mut rest: &mut [u64] = &mut gather_map;
        for (chunk, &offset) in self.chunk_offsets.iter().enumerate() {
            let end = self
                .chunk_offsets
                .get(chunk + 1)
                .copied()
                .unwrap_or(self.output_size);
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(end - offset);
            slices.push(head);
            rest = tail;
        }

        let chunk_len = self.chunk_len;
        decisions
            .par_chunks(chunk_len)
            .zip(slices.into_par_iter())
            .enumerate()
            .for_each(|(chunk, (flags, out))| {
                let base = chunk * chunk_len;
                let mut next = 0;
                for (i, &keep) in flags.iter().enumerate() {
                    if keep {
                        out[next] = (base + i) as u64;
                        next += 1;
                    }
                }
            });

        gather_map
    }
}

/// Rows selected out of the input, either as decisions or as explicit indices
pub(crate) enum Selection<'a> {
    Decisions { decisions: &'a [bool], kept: usize },
    Indices(&'a [u64]),
}

impl Selection<'_> {
    fn len(&self) -> usize {
        match self {
            Selection::Decisions { kept, .. } => *kept,
            Selection::Indices(indices) => indices.len(),
        }
    }

    fn sum_over_rows<F>(&self, f: F) -> usize
    where
        F: Fn(usize) -> usize + Sync + Send,
    {
        match self {
            Selection::Decisions { decisions, .. } => decisions
                .par_iter()
                .enumerate()
                .filter(|(_, keep)| **keep)
                .map(|(row, _)| f(row))
                .sum(),
            Selection::Indices(indices) => indices.par_iter().map(|&row| f(row as usize)).sum(),
        }
    }
}

fn byte_array_footprint<T: ByteArrayType>(column: &ArrayRef, selection: &Selection) -> Option<usize> {
    let array = column.as_bytes_opt::<T>()?;
    let values = selection.sum_over_rows(|row| array.value_length(row).as_usize());
    Some(values + (selection.len() + 1) * size_of::<T::Offset>())
}

/// Bytes needed to hold the selected rows of `column`
fn gathered_footprint(column: &ArrayRef, selection: &Selection) -> usize {
    let rows = selection.len();
    let validity = if column.null_count() > 0 {
        rows.div_ceil(8)
    } else {
        0
    };

    let values = match column.data_type() {
        DataType::Boolean => Some(rows.div_ceil(8)),
        DataType::Utf8 => byte_array_footprint::<Utf8Type>(column, selection),
        DataType::LargeUtf8 => byte_array_footprint::<LargeUtf8Type>(column, selection),
        DataType::Binary => byte_array_footprint::<BinaryType>(column, selection),
        DataType::LargeBinary => byte_array_footprint::<LargeBinaryType>(column, selection),
        data_type => data_type.primitive_width().map(|width| rows * width),
    };

    // nested and other variable-width payloads: scale the input footprint
    let values = values.unwrap_or_else(|| match column.len() {
        0 => 0,
        len => column.get_array_memory_size() / len * rows,
    });

    values + validity
}

/// Exact footprint of the compacted batch
fn output_footprint(batch: &RecordBatch, selection: &Selection) -> usize {
    batch
        .columns()
        .par_iter()
        .map(|column| gathered_footprint(column, selection))
        .sum()
}

/// Gather every column through `gather_map`, holding `reservation` on the output
fn gather_columns(
    batch: &RecordBatch,
    gather_map: Vec<u64>,
    reservation: Reservation,
) -> CompactionResult<Table> {
    let num_rows = gather_map.len();
    let indices = UInt64Array::from(gather_map);
    let columns = batch
        .columns()
        .par_iter()
        .map(|column| take(column.as_ref(), &indices, None))
        .collect::<Result<Vec<ArrayRef>, _>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    let output = RecordBatch::try_new_with_options(batch.schema(), columns, &options)?;
    Ok(Table::with_reservation(output, reservation))
}

/// Copy the rows of `batch` whose decision is true, preserving their order
pub(crate) fn copy_if(
    batch: &RecordBatch,
    decisions: &[bool],
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    debug_assert_eq!(decisions.len(), batch.num_rows());

    let plan = CompactionPlan::scan(decisions, stream);
    let output_size = plan.compute_output_size();
    compaction_debug!(
        "compacting {} of {} rows on stream '{}'",
        output_size,
        batch.num_rows(),
        stream.name()
    );

    let selection = Selection::Decisions {
        decisions,
        kept: output_size,
    };
    let reservation = Reservation::try_new(mr, output_footprint(batch, &selection), stream)?;
    let _gather_scratch = Reservation::try_new(mr, output_size * size_of::<u64>(), stream)?;

    let gather_map = plan.fill_gather_map(decisions);
    gather_columns(batch, gather_map, reservation)
}

/// Materialize the rows at `indices`, in the order given
pub(crate) fn gather(
    batch: &RecordBatch,
    indices: Vec<u64>,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    let reservation = Reservation::try_new(
        mr,
        output_footprint(batch, &Selection::Indices(&indices)),
        stream,
    )?;
    compaction_debug!(
        "gathering {} of {} rows on stream '{}'",
        indices.len(),
        batch.num_rows(),
        stream.name()
    );
    gather_columns(batch, indices, reservation)
}

/// Reserve scratch space for `rows` per-row values of type `T`
pub(crate) fn scratch<T>(
    rows: usize,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Reservation> {
    Reservation::try_new(mr, rows * size_of::<T>(), stream)
}
