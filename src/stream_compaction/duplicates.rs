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

//! Duplicate row removal

use std::sync::Arc;

use super::copy_if::{copy_if, gather, scratch};
use super::policy::{KeepOption, NullEquality, NullOrder};
use super::{hash_distinct, sort_distinct};
use super::{key_columns, validate_key_types};
use crate::arrow::{RowComparator, RowHasher};
use crate::ctx::Stream;
use crate::error::CompactionResult;
use crate::memory::MemoryResource;
use crate::table::Table;

/// Remove rows whose `keys` duplicate another row, keeping survivors per
/// `keep`. Survivors stay in their original relative order.
pub fn drop_duplicates(
    input: &Table,
    keys: &[usize],
    keep: KeepOption,
    nulls_equal: NullEquality,
    null_order: NullOrder,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    input.validate_column_indices(keys)?;
    validate_key_types(input, keys)?;

    stream.launch("drop_duplicates", || {
        let batch = input.combined_batch()?;
        let num_rows = batch.num_rows();
        let comparator =
            RowComparator::for_columns(&key_columns(&batch, keys), nulls_equal, null_order)?;

        // sorted row order plus the run heads and decisions
        let _sorted = scratch::<usize>(num_rows, stream, mr)?;
        let _flags = scratch::<bool>(2 * num_rows, stream, mr)?;

        let decisions = sort_distinct::survivor_decisions(&comparator, num_rows, keep, stream);
        copy_if(&batch, &decisions, stream, mr)
    })
}

/// Keep one row per distinct key; the output order is unspecified
pub fn unordered_drop_duplicates(
    input: &Table,
    keys: &[usize],
    nulls_equal: NullEquality,
    stream: &Stream,
    mr: &Arc<dyn MemoryResource>,
) -> CompactionResult<Table> {
    input.validate_column_indices(keys)?;
    validate_key_types(input, keys)?;

    stream.launch("unordered_drop_duplicates", || {
        let batch = input.combined_batch()?;
        let num_rows = batch.num_rows();
        let key_columns = key_columns(&batch, keys);
        let comparator = RowComparator::for_columns(&key_columns, nulls_equal, NullOrder::default())?;

        // row hashes plus the row list and hash table slots
        let _hashes = scratch::<u64>(num_rows, stream, mr)?;
        let _slots = scratch::<usize>(2 * num_rows, stream, mr)?;

        let hasher = RowHasher::try_new(&key_columns, num_rows, stream)?;
        let rows: Vec<usize> = (0..num_rows).collect();
        let representatives =
            hash_distinct::representatives(&comparator, &hasher, &rows, nulls_equal, stream);

        gather(
            &batch,
            representatives.into_iter().map(|row| row as u64).collect(),
            stream,
            mr,
        )
    })
}
