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

//! Arrow kernels for key columns: row comparison and row hashing

use arrow::datatypes::{DataType, TimeUnit};

/// Expand to a match over every supported key type.
///
/// `$primitive!`, `$float!` and `$bytes!` are invoked with the arrow type marker;
/// `$boolean` and `$unsupported` are plain expressions.
macro_rules! dispatch_key_type {
    ($data_type:expr, $primitive:ident, $float:ident, $boolean:expr, $bytes:ident, $unsupported:expr) => {{
        use ::arrow::datatypes::*;
        match $data_type {
            DataType::Boolean => $boolean,
            DataType::Int8 => $primitive!(Int8Type),
            DataType::Int16 => $primitive!(Int16Type),
            DataType::Int32 => $primitive!(Int32Type),
            DataType::Int64 => $primitive!(Int64Type),
            DataType::UInt8 => $primitive!(UInt8Type),
            DataType::UInt16 => $primitive!(UInt16Type),
            DataType::UInt32 => $primitive!(UInt32Type),
            DataType::UInt64 => $primitive!(UInt64Type),
            DataType::Date32 => $primitive!(Date32Type),
            DataType::Date64 => $primitive!(Date64Type),
            DataType::Time32(TimeUnit::Second) => $primitive!(Time32SecondType),
            DataType::Time32(TimeUnit::Millisecond) => $primitive!(Time32MillisecondType),
            DataType::Time64(TimeUnit::Microsecond) => $primitive!(Time64MicrosecondType),
            DataType::Time64(TimeUnit::Nanosecond) => $primitive!(Time64NanosecondType),
            DataType::Timestamp(TimeUnit::Second, _) => $primitive!(TimestampSecondType),
            DataType::Timestamp(TimeUnit::Millisecond, _) => $primitive!(TimestampMillisecondType),
            DataType::Timestamp(TimeUnit::Microsecond, _) => $primitive!(TimestampMicrosecondType),
            DataType::Timestamp(TimeUnit::Nanosecond, _) => $primitive!(TimestampNanosecondType),
            DataType::Duration(TimeUnit::Second) => $primitive!(DurationSecondType),
            DataType::Duration(TimeUnit::Millisecond) => $primitive!(DurationMillisecondType),
            DataType::Duration(TimeUnit::Microsecond) => $primitive!(DurationMicrosecondType),
            DataType::Duration(TimeUnit::Nanosecond) => $primitive!(DurationNanosecondType),
            DataType::Float16 => $float!(Float16Type),
            DataType::Float32 => $float!(Float32Type),
            DataType::Float64 => $float!(Float64Type),
            DataType::Utf8 => $bytes!(Utf8Type),
            DataType::LargeUtf8 => $bytes!(LargeUtf8Type),
            DataType::Binary => $bytes!(BinaryType),
            DataType::LargeBinary => $bytes!(LargeBinaryType),
            _ => $unsupported,
        }
    }};
}

pub mod arrow_comparator;
pub mod arrow_hash_kernels;

pub use arrow_comparator::RowComparator;
pub use arrow_hash_kernels::RowHasher;

/// Whether columns of `data_type` can take part in a key set
pub fn is_supported_key_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Date32
            | DataType::Date64
            | DataType::Time32(TimeUnit::Second | TimeUnit::Millisecond)
            | DataType::Time64(TimeUnit::Microsecond | TimeUnit::Nanosecond)
            | DataType::Timestamp(_, _)
            | DataType::Duration(_)
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Binary
            | DataType::LargeBinary
    )
}

/// NaN test that works for every arrow float native type
#[inline]
pub(crate) fn is_nan_value<N: PartialOrd>(value: &N) -> bool {
    value.partial_cmp(value).is_none()
}
