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

//! Hash-based duplicate resolution

use hashbrown::HashTable;
use rayon::prelude::*;

use super::policy::NullEquality;
use crate::arrow::{RowComparator, RowHasher};
use crate::ctx::Stream;

/// First row of each class within one partition, in input order
fn dedupe_partition(
    comparator: &RowComparator,
    hasher: &RowHasher,
    rows: &[usize],
    nulls_equal: NullEquality,
) -> Vec<usize> {
    let mut table: HashTable<usize> = HashTable::with_capacity(rows.len());
    let mut representatives = Vec::new();

    for &row in rows {
        // a null key never matches, so the row is its own class
        if nulls_equal == NullEquality::Unequal && comparator.has_null(row) {
            representatives.push(row);
            continue;
        }
        let hash = hasher.hash(row);
        if table.find(hash, |&other| comparator.equal(other, row)).is_none() {
            table.insert_unique(hash, row, |&other| hasher.hash(other));
            representatives.push(row);
        }
    }

    representatives
}

/// One representative row per equivalence class among `rows`.
///
/// Large inputs are hash partitioned and each partition is deduplicated in
/// parallel, so the order of the result is unspecified.
pub(crate) fn representatives(
    comparator: &RowComparator,
    hasher: &RowHasher,
    rows: &[usize],
    nulls_equal: NullEquality,
    stream: &Stream,
) -> Vec<usize> {
    let num_partitions = if stream.config().is_parallel(rows.len()) {
        stream.num_threads().max(1)
    } else {
        1
    };

    if num_partitions == 1 {
        return dedupe_partition(comparator, hasher, rows, nulls_equal);
    }

    compaction_debug!(
        "hash partitioning {} rows into {} partitions",
        rows.len(),
        num_partitions
    );

    let mut partitions: Vec<Vec<usize>> = vec![Vec::new(); num_partitions];
    for &row in rows {
        let partition = (hasher.hash(row) % num_partitions as u64) as usize;
        partitions[partition].push(row);
    }

    partitions
        .par_iter()
        .map(|partition| dedupe_partition(comparator, hasher, partition, nulls_equal))
        .collect::<Vec<_>>()
        .concat()
}
