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

//! Sort-based duplicate resolution
//!
//! Rows are stably sorted by the key order, so each equivalence class becomes
//! a contiguous run whose members keep their original relative order.

use rayon::prelude::*;

use super::policy::KeepOption;
use crate::arrow::RowComparator;
use crate::ctx::Stream;

/// Stable sort of `rows` by the comparator's lexicographic order
fn sort_rows(rows: &mut [usize], comparator: &RowComparator, stream: &Stream) {
    if stream.config().is_parallel(rows.len()) {
        rows.par_sort_by(|&a, &b| comparator.compare(a, b));
    } else {
        rows.sort_by(|&a, &b| comparator.compare(a, b));
    }
}

/// `heads[k]` is true when `sorted[k]` starts a run of equal rows
fn run_heads(sorted: &[usize], comparator: &RowComparator, stream: &Stream) -> Vec<bool> {
    let mut heads = vec![false; sorted.len()];
    let chunk_len = stream.config().chunk_len(sorted.len());
    heads
        .par_chunks_mut(chunk_len)
        .enumerate()
        .for_each(|(chunk, out)| {
            let base = chunk * chunk_len;
            for (i, head) in out.iter_mut().enumerate() {
                let k = base + i;
                *head = k == 0 || !comparator.equal(sorted[k - 1], sorted[k]);
            }
        });
    heads
}

/// Keep decisions over original row positions for the survivors of each run
pub(crate) fn survivor_decisions(
    comparator: &RowComparator,
    num_rows: usize,
    keep: KeepOption,
    stream: &Stream,
) -> Vec<bool> {
    let mut sorted: Vec<usize> = (0..num_rows).collect();
    sort_rows(&mut sorted, comparator, stream);
    let heads = run_heads(&sorted, comparator, stream);

    let is_tail = |k: usize| k + 1 == num_rows || heads[k + 1];
    let survivors: Vec<usize> = (0..num_rows)
        .into_par_iter()
        .filter(|&k| match keep {
            KeepOption::First => heads[k],
            KeepOption::Last => is_tail(k),
            KeepOption::None => heads[k] && is_tail(k),
        })
        .map(|k| sorted[k])
        .collect();

    compaction_trace!(
        "{} of {} rows survive {:?}",
        survivors.len(),
        num_rows,
        keep
    );

    let mut decisions = vec![false; num_rows];
    for row in survivors {
        decisions[row] = true;
    }
    decisions
}

/// Number of equivalence classes among `rows`
pub(crate) fn count_classes(comparator: &RowComparator, mut rows: Vec<usize>, stream: &Stream) -> usize {
    sort_rows(&mut rows, comparator, stream);
    run_heads(&rows, comparator, stream)
        .into_par_iter()
        .filter(|&head| head)
        .count()
}
