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

//! Execution configuration for compaction kernels.

use crate::error::{CompactionError, CompactionResult};

/// Environment variable overriding [`CompactionConfig::parallel_threshold`]
pub const ENV_PARALLEL_THRESHOLD: &str = "CYLON_COMPACTION_PARALLEL_THRESHOLD";
/// Environment variable overriding [`CompactionConfig::chunk_size`]
pub const ENV_CHUNK_SIZE: &str = "CYLON_COMPACTION_CHUNK_SIZE";
/// Environment variable overriding [`CompactionConfig::num_threads`]
pub const ENV_THREADS: &str = "CYLON_COMPACTION_THREADS";

const DEFAULT_PARALLEL_THRESHOLD: usize = 32 * 1024;
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Tuning knobs carried by every [`Stream`](crate::ctx::Stream).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactionConfig {
    /// Inputs with fewer rows than this run as a single chunk
    pub parallel_threshold: usize,
    /// Rows per chunk for the scan, predicate and gather-map kernels
    pub chunk_size: usize,
    /// Worker threads for a dedicated stream pool; `None` uses the global rayon pool
    pub num_threads: Option<usize>,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            num_threads: None,
        }
    }
}

impl CompactionConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the `CYLON_COMPACTION_*` environment variables,
    /// falling back to defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = read_env_usize(ENV_PARALLEL_THRESHOLD) {
            config.parallel_threshold = v;
        }
        if let Some(v) = read_env_usize(ENV_CHUNK_SIZE) {
            if v > 0 {
                config.chunk_size = v;
            }
        }
        if let Some(v) = read_env_usize(ENV_THREADS) {
            if v > 0 {
                config.num_threads = Some(v);
            }
        }
        config
    }

    /// Set the parallel threshold
    pub fn with_parallel_threshold(mut self, rows: usize) -> Self {
        self.parallel_threshold = rows;
        self
    }

    /// Set the chunk size
    pub fn with_chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows;
        self
    }

    /// Use a dedicated pool with the given number of threads
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> CompactionResult<()> {
        if self.chunk_size == 0 {
            return Err(CompactionError::Invalid(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(CompactionError::Invalid(
                "num_threads must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Chunk length to use for an input of `num_rows` rows.
    ///
    /// Small inputs collapse to one chunk so the kernels stay sequential.
    pub fn chunk_len(&self, num_rows: usize) -> usize {
        if num_rows < self.parallel_threshold {
            num_rows.max(1)
        } else {
            self.chunk_size.max(1)
        }
    }

    /// Whether an input of `num_rows` rows takes the parallel path
    pub fn is_parallel(&self, num_rows: usize) -> bool {
        num_rows >= self.parallel_threshold
    }
}

fn read_env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a non-negative integer", key, raw);
            None
        }
    }
}
