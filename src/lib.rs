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

//! Cylon compaction: stream compaction over Arrow column tables
//!
//! Filters rows by null counts, NaN counts or a boolean mask, removes
//! duplicate rows, and counts distinct values and rows. Every operation runs
//! on an ordered execution [`Stream`] and draws its output memory from a
//! [`MemoryResource`].

#[macro_use]
pub mod util;

pub mod arrow;
pub mod config;
pub mod ctx;
pub mod error;
pub mod memory;
pub mod stream_compaction;
pub mod table;

// Re-export commonly used types
pub use crate::config::CompactionConfig;
pub use crate::ctx::{default_stream, set_default_stream, Event, Pending, Stream};
pub use crate::error::{Code, CompactionError, CompactionResult};
pub use crate::memory::{
    current_memory_resource, set_current_memory_resource, LimitingMemoryResource, MemoryResource,
    SystemMemoryResource,
};
pub use crate::stream_compaction::{
    apply_boolean_mask, distinct_count, distinct_count_table, drop_any_nans, drop_any_nulls,
    drop_duplicates, drop_nans, drop_nulls, is_nan, unordered_distinct_count,
    unordered_distinct_count_table, unordered_drop_duplicates, KeepOption, NanHandling,
    NullEquality, NullHandling, NullOrder,
};
pub use crate::table::column::FromVector;
pub use crate::table::{Column, Table};
pub use crate::util::logging::{init_logging, init_logging_with_level};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
