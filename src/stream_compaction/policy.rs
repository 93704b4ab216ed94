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

//! Null, NaN and duplicate policies threaded through the compaction kernels

/// Whether nulls form a group of their own when counting distinct values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullHandling {
    /// Nulls are not counted
    #[default]
    Exclude,
    /// All nulls count as one distinct value
    Include,
}

/// How NaN values are grouped when counting distinct values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NanHandling {
    /// NaNs fold into the null group
    NanIsNull,
    /// All NaNs count as one distinct value
    #[default]
    NanIsValue,
}

/// Whether two nulls in the same key position compare equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullEquality {
    #[default]
    Equal,
    /// A null never matches anything, itself included
    Unequal,
}

/// Where nulls sort relative to valid values in the internal row order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullOrder {
    #[default]
    Before,
    After,
}

/// Which members of a duplicate group survive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepOption {
    /// The member with the smallest row position
    #[default]
    First,
    /// The member with the largest row position
    Last,
    /// No member of a group with two or more rows
    None,
}
