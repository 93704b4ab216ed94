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

//! Row comparators over key columns
//!
//! A [`RowComparator`] compares row `l` of a left set of key columns with row `r`
//! of a right set of the same schema. For a single table both sides are the same
//! columns. Value comparison is chosen once per column from its type; the null
//! policies are applied by the row comparator itself.

use std::cmp::Ordering;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, GenericByteArray, PrimitiveArray};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{ArrowPrimitiveType, ByteArrayType};

use super::is_nan_value;
use crate::error::{CompactionError, CompactionResult};
use crate::stream_compaction::policy::{NullEquality, NullOrder};

/// Compares valid values of one key column across the two sides
trait ValueComparator: Send + Sync {
    fn compare(&self, lhs: usize, rhs: usize) -> Ordering;

    fn equal_to(&self, lhs: usize, rhs: usize) -> bool;
}

fn downcast_primitive<T: ArrowPrimitiveType>(array: &ArrayRef) -> CompactionResult<PrimitiveArray<T>> {
    array.as_primitive_opt::<T>().cloned().ok_or_else(|| {
        CompactionError::TypeMismatch(format!(
            "expected {} column, found {}",
            T::DATA_TYPE,
            array.data_type()
        ))
    })
}

/// Integer and temporal types; their natives are totally ordered
struct PrimitiveComparator<T: ArrowPrimitiveType> {
    lhs: PrimitiveArray<T>,
    rhs: PrimitiveArray<T>,
}

impl<T: ArrowPrimitiveType> PrimitiveComparator<T> {
    fn try_new(lhs: &ArrayRef, rhs: &ArrayRef) -> CompactionResult<Self> {
        Ok(Self {
            lhs: downcast_primitive::<T>(lhs)?,
            rhs: downcast_primitive::<T>(rhs)?,
        })
    }
}

impl<T: ArrowPrimitiveType> ValueComparator for PrimitiveComparator<T> {
    #[inline]
    fn compare(&self, lhs: usize, rhs: usize) -> Ordering {
        self.lhs
            .value(lhs)
            .partial_cmp(&self.rhs.value(rhs))
            .unwrap_or(Ordering::Equal)
    }

    #[inline]
    fn equal_to(&self, lhs: usize, rhs: usize) -> bool {
        self.lhs.value(lhs) == self.rhs.value(rhs)
    }
}

/// Floating point: NaNs are equal to each other and sort after every number,
/// `-0.0` equals `0.0`.
struct FloatComparator<T: ArrowPrimitiveType> {
    lhs: PrimitiveArray<T>,
    rhs: PrimitiveArray<T>,
}

impl<T: ArrowPrimitiveType> FloatComparator<T> {
    fn try_new(lhs: &ArrayRef, rhs: &ArrayRef) -> CompactionResult<Self> {
        Ok(Self {
            lhs: downcast_primitive::<T>(lhs)?,
            rhs: downcast_primitive::<T>(rhs)?,
        })
    }
}

#[inline]
fn compare_floats<N: PartialOrd>(a: N, b: N) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ordering) => ordering,
        None => match (is_nan_value(&a), is_nan_value(&b)) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        },
    }
}

impl<T: ArrowPrimitiveType> ValueComparator for FloatComparator<T> {
    #[inline]
    fn compare(&self, lhs: usize, rhs: usize) -> Ordering {
        compare_floats(self.lhs.value(lhs), self.rhs.value(rhs))
    }

    #[inline]
    fn equal_to(&self, lhs: usize, rhs: usize) -> bool {
        self.compare(lhs, rhs) == Ordering::Equal
    }
}

struct BooleanComparator {
    lhs: BooleanArray,
    rhs: BooleanArray,
}

impl BooleanComparator {
    fn try_new(lhs: &ArrayRef, rhs: &ArrayRef) -> CompactionResult<Self> {
        let downcast = |array: &ArrayRef| {
            array.as_boolean_opt().cloned().ok_or_else(|| {
                CompactionError::TypeMismatch(format!(
                    "expected Boolean column, found {}",
                    array.data_type()
                ))
            })
        };
        Ok(Self {
            lhs: downcast(lhs)?,
            rhs: downcast(rhs)?,
        })
    }
}

impl ValueComparator for BooleanComparator {
    #[inline]
    fn compare(&self, lhs: usize, rhs: usize) -> Ordering {
        self.lhs.value(lhs).cmp(&self.rhs.value(rhs))
    }

    #[inline]
    fn equal_to(&self, lhs: usize, rhs: usize) -> bool {
        self.lhs.value(lhs) == self.rhs.value(rhs)
    }
}

/// Utf8, LargeUtf8, Binary and LargeBinary
struct BytesComparator<T: ByteArrayType> {
    lhs: GenericByteArray<T>,
    rhs: GenericByteArray<T>,
}

impl<T: ByteArrayType> BytesComparator<T> {
    fn try_new(lhs: &ArrayRef, rhs: &ArrayRef) -> CompactionResult<Self> {
        let downcast = |array: &ArrayRef| {
            array.as_bytes_opt::<T>().cloned().ok_or_else(|| {
                CompactionError::TypeMismatch(format!(
                    "expected {} column, found {}",
                    T::DATA_TYPE,
                    array.data_type()
                ))
            })
        };
        Ok(Self {
            lhs: downcast(lhs)?,
            rhs: downcast(rhs)?,
        })
    }
}

impl<T> ValueComparator for BytesComparator<T>
where
    T: ByteArrayType,
    T::Native: Ord,
{
    #[inline]
    fn compare(&self, lhs: usize, rhs: usize) -> Ordering {
        self.lhs.value(lhs).cmp(self.rhs.value(rhs))
    }

    #[inline]
    fn equal_to(&self, lhs: usize, rhs: usize) -> bool {
        self.lhs.value(lhs) == self.rhs.value(rhs)
    }
}

fn create_value_comparator(lhs: &ArrayRef, rhs: &ArrayRef) -> CompactionResult<Box<dyn ValueComparator>> {
    macro_rules! primitive {
        ($t:ty) => {
            Ok(Box::new(PrimitiveComparator::<$t>::try_new(lhs, rhs)?) as Box<dyn ValueComparator>)
        };
    }
    macro_rules! float {
        ($t:ty) => {
            Ok(Box::new(FloatComparator::<$t>::try_new(lhs, rhs)?) as Box<dyn ValueComparator>)
        };
    }
    macro_rules! bytes {
        ($t:ty) => {
            Ok(Box::new(BytesComparator::<$t>::try_new(lhs, rhs)?) as Box<dyn ValueComparator>)
        };
    }

    dispatch_key_type!(
        lhs.data_type(),
        primitive,
        float,
        Ok(Box::new(BooleanComparator::try_new(lhs, rhs)?) as Box<dyn ValueComparator>),
        bytes,
        Err(CompactionError::TypeMismatch(format!(
            "unsupported key column type {}",
            lhs.data_type()
        )))
    )
}

/// One key column: validity of both sides plus its value comparator
struct KeyColumn {
    lhs_nulls: Option<NullBuffer>,
    rhs_nulls: Option<NullBuffer>,
    values: Box<dyn ValueComparator>,
}

impl KeyColumn {
    #[inline]
    fn lhs_valid(&self, row: usize) -> bool {
        self.lhs_nulls.as_ref().map_or(true, |nulls| nulls.is_valid(row))
    }

    #[inline]
    fn rhs_valid(&self, row: usize) -> bool {
        self.rhs_nulls.as_ref().map_or(true, |nulls| nulls.is_valid(row))
    }
}

/// Equality and lexicographic order of rows across a key set
pub struct RowComparator {
    columns: Vec<KeyColumn>,
    nulls_equal: NullEquality,
    null_order: NullOrder,
}

impl RowComparator {
    /// Compare rows of `lhs` with rows of `rhs`; both sides must have the same key schema
    pub fn try_new(
        lhs: &[ArrayRef],
        rhs: &[ArrayRef],
        nulls_equal: NullEquality,
        null_order: NullOrder,
    ) -> CompactionResult<Self> {
        if lhs.len() != rhs.len() {
            return Err(CompactionError::Invalid(format!(
                "key sets differ in width: {} vs {}",
                lhs.len(),
                rhs.len()
            )));
        }

        let mut columns = Vec::with_capacity(lhs.len());
        for (i, (l, r)) in lhs.iter().zip(rhs).enumerate() {
            if l.data_type() != r.data_type() {
                return Err(CompactionError::TypeMismatch(format!(
                    "key {} has type {} on the left and {} on the right",
                    i,
                    l.data_type(),
                    r.data_type()
                )));
            }
            columns.push(KeyColumn {
                lhs_nulls: l.nulls().cloned(),
                rhs_nulls: r.nulls().cloned(),
                values: create_value_comparator(l, r)?,
            });
        }

        Ok(Self {
            columns,
            nulls_equal,
            null_order,
        })
    }

    /// Compare rows within one set of key columns
    pub fn for_columns(
        columns: &[ArrayRef],
        nulls_equal: NullEquality,
        null_order: NullOrder,
    ) -> CompactionResult<Self> {
        Self::try_new(columns, columns, nulls_equal, null_order)
    }

    /// Row equality under the configured [`NullEquality`]
    #[inline]
    pub fn equal(&self, lhs: usize, rhs: usize) -> bool {
        for column in &self.columns {
            match (column.lhs_valid(lhs), column.rhs_valid(rhs)) {
                (true, true) => {
                    if !column.values.equal_to(lhs, rhs) {
                        return false;
                    }
                }
                (false, false) => {
                    if self.nulls_equal == NullEquality::Unequal {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }

    /// Lexicographic order in key order, nulls placed per [`NullOrder`]
    #[inline]
    pub fn compare(&self, lhs: usize, rhs: usize) -> Ordering {
        for column in &self.columns {
            let ordering = match (column.lhs_valid(lhs), column.rhs_valid(rhs)) {
                (true, true) => column.values.compare(lhs, rhs),
                (false, false) => Ordering::Equal,
                (false, true) => match self.null_order {
                    NullOrder::Before => Ordering::Less,
                    NullOrder::After => Ordering::Greater,
                },
                (true, false) => match self.null_order {
                    NullOrder::Before => Ordering::Greater,
                    NullOrder::After => Ordering::Less,
                },
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Whether any key of left-side row `row` is null
    #[inline]
    pub fn has_null(&self, row: usize) -> bool {
        self.columns.iter().any(|column| !column.lhs_valid(row))
    }
}
