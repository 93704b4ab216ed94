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

//! Row hashing for the hash-based engines
//!
//! Hashes agree with [`RowComparator`](super::RowComparator) equality: every NaN
//! hashes alike, `-0.0` hashes as `0.0`, and a null contributes a fixed sentinel.

use std::hash::{Hash, Hasher};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{ArrowPrimitiveType, ByteArrayType, ToByteSlice};
use rayon::prelude::*;

use super::is_nan_value;
use crate::ctx::Stream;
use crate::error::{CompactionError, CompactionResult};

/// Contribution of a null key position
pub const NULL_HASH_SENTINEL: u64 = 0x9e37_79b9_7f4a_7c15;
const NAN_HASH_SENTINEL: u64 = 0x7ff8_dead_beef_0001;
const SEED: u64 = 31;

#[inline]
fn hash_value<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = ahash::AHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

#[inline]
fn combine(partial: u64, hash: u64) -> u64 {
    hash.wrapping_add(SEED.wrapping_mul(partial))
}

/// Folds the hash of one column into running row hashes
trait HashKernel: Send + Sync {
    /// Update `partial_hashes[i]` with the hash of row `offset + i` of `column`
    fn update_hash(&self, column: &ArrayRef, offset: usize, partial_hashes: &mut [u64]) -> CompactionResult<()>;
}

fn downcast_error(column: &ArrayRef, expected: impl std::fmt::Display) -> CompactionError {
    CompactionError::TypeMismatch(format!(
        "expected {} column, found {}",
        expected,
        column.data_type()
    ))
}

struct PrimitiveHashKernel<T: ArrowPrimitiveType> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T: ArrowPrimitiveType> HashKernel for PrimitiveHashKernel<T> {
    fn update_hash(&self, column: &ArrayRef, offset: usize, partial_hashes: &mut [u64]) -> CompactionResult<()> {
        let array = column
            .as_primitive_opt::<T>()
            .ok_or_else(|| downcast_error(column, T::DATA_TYPE))?;
        for (i, partial) in partial_hashes.iter_mut().enumerate() {
            let row = offset + i;
            let hash = if array.is_null(row) {
                NULL_HASH_SENTINEL
            } else {
                hash_value(array.value(row).to_byte_slice())
            };
            *partial = combine(*partial, hash);
        }
        Ok(())
    }
}

struct FloatHashKernel<T: ArrowPrimitiveType> {
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T: ArrowPrimitiveType> HashKernel for FloatHashKernel<T> {
    fn update_hash(&self, column: &ArrayRef, offset: usize, partial_hashes: &mut [u64]) -> CompactionResult<()> {
        let array = column
            .as_primitive_opt::<T>()
            .ok_or_else(|| downcast_error(column, T::DATA_TYPE))?;
        let zero = T::Native::default();
        for (i, partial) in partial_hashes.iter_mut().enumerate() {
            let row = offset + i;
            let hash = if array.is_null(row) {
                NULL_HASH_SENTINEL
            } else {
                let value = array.value(row);
                if is_nan_value(&value) {
                    NAN_HASH_SENTINEL
                } else if value == zero {
                    // covers -0.0
                    hash_value(zero.to_byte_slice())
                } else {
                    hash_value(value.to_byte_slice())
                }
            };
            *partial = combine(*partial, hash);
        }
        Ok(())
    }
}

struct BooleanHashKernel;

impl HashKernel for BooleanHashKernel {
    fn update_hash(&self, column: &ArrayRef, offset: usize, partial_hashes: &mut [u64]) -> CompactionResult<()> {
        let array = column
            .as_boolean_opt()
            .ok_or_else(|| downcast_error(column, "Boolean"))?;
        for (i, partial) in partial_hashes.iter_mut().enumerate() {
            let row = offset + i;
            let hash = if array.is_null(row) {
                NULL_HASH_SENTINEL
            } else {
                hash_value(&array.value(row))
            };
            *partial = combine(*partial, hash);
        }
        Ok(())
    }
}

struct BytesHashKernel<T: ByteArrayType> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> HashKernel for BytesHashKernel<T>
where
    T: ByteArrayType,
    T::Native: AsRef<[u8]>,
{
    fn update_hash(&self, column: &ArrayRef, offset: usize, partial_hashes: &mut [u64]) -> CompactionResult<()> {
        let array = column
            .as_bytes_opt::<T>()
            .ok_or_else(|| downcast_error(column, T::DATA_TYPE))?;
        for (i, partial) in partial_hashes.iter_mut().enumerate() {
            let row = offset + i;
            let hash = if array.is_null(row) {
                NULL_HASH_SENTINEL
            } else {
                hash_value(array.value(row).as_ref())
            };
            *partial = combine(*partial, hash);
        }
        Ok(())
    }
}

fn create_hash_kernel(column: &ArrayRef) -> CompactionResult<Box<dyn HashKernel>> {
    macro_rules! primitive {
        ($t:ty) => {
            Ok(Box::new(PrimitiveHashKernel::<$t> {
                _phantom: std::marker::PhantomData,
            }) as Box<dyn HashKernel>)
        };
    }
    macro_rules! float {
        ($t:ty) => {
            Ok(Box::new(FloatHashKernel::<$t> {
                _phantom: std::marker::PhantomData,
            }) as Box<dyn HashKernel>)
        };
    }
    macro_rules! bytes {
        ($t:ty) => {
            Ok(Box::new(BytesHashKernel::<$t> {
                _phantom: std::marker::PhantomData,
            }) as Box<dyn HashKernel>)
        };
    }

    dispatch_key_type!(
        column.data_type(),
        primitive,
        float,
        Ok(Box::new(BooleanHashKernel) as Box<dyn HashKernel>),
        bytes,
        Err(CompactionError::TypeMismatch(format!(
            "unsupported key column type {}",
            column.data_type()
        )))
    )
}

/// Precomputed hash of every row over a key set
pub struct RowHasher {
    hashes: Vec<u64>,
}

impl RowHasher {
    /// Hash `num_rows` rows of `columns`, chunked across the stream's pool
    pub fn try_new(columns: &[ArrayRef], num_rows: usize, stream: &Stream) -> CompactionResult<Self> {
        let mut hashes = vec![0u64; num_rows];
        let chunk_len = stream.config().chunk_len(num_rows);

        for column in columns {
            if column.len() != num_rows {
                return Err(CompactionError::RowCountMismatch {
                    expected: num_rows,
                    actual: column.len(),
                });
            }
            let kernel = create_hash_kernel(column)?;
            hashes
                .par_chunks_mut(chunk_len)
                .enumerate()
                .try_for_each(|(chunk, partial)| {
                    kernel.update_hash(column, chunk * chunk_len, partial)
                })?;
        }

        Ok(Self { hashes })
    }

    /// Hash of row `row`
    #[inline]
    pub fn hash(&self, row: usize) -> u64 {
        self.hashes[row]
    }
}
