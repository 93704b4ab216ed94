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

//! Column type

use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::DataType;

/// Column wrapper around an Arrow array
#[derive(Clone, Debug)]
pub struct Column {
    data: ArrayRef,
}

impl Column {
    /// Create a new Column from an Arrow Array
    pub fn new(data: ArrayRef) -> Self {
        Self { data }
    }

    /// Return the data wrapped by column
    pub fn data(&self) -> &ArrayRef {
        &self.data
    }

    /// Return the data type of the column
    pub fn data_type(&self) -> &DataType {
        self.data.data_type()
    }

    /// Return the length of the column
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    /// Whether the column can hold NaN values
    pub fn is_floating(&self) -> bool {
        self.data.data_type().is_floating()
    }

    /// Whether the column is boolean typed
    pub fn is_boolean(&self) -> bool {
        matches!(self.data.data_type(), DataType::Boolean)
    }
}

impl From<ArrayRef> for Column {
    fn from(data: ArrayRef) -> Self {
        Column::new(data)
    }
}

/// Trait for creating columns from vectors of native values
pub trait FromVector<T> {
    fn from_vector(data: &[T]) -> Column;
}

macro_rules! impl_from_vector {
    ($native:ty, $array:ty) => {
        impl FromVector<$native> for Column {
            fn from_vector(data: &[$native]) -> Column {
                Column::new(Arc::new(<$array>::from(data.to_vec())))
            }
        }

        impl FromVector<Option<$native>> for Column {
            fn from_vector(data: &[Option<$native>]) -> Column {
                Column::new(Arc::new(<$array>::from(data.to_vec())))
            }
        }
    };
}

impl_from_vector!(bool, arrow::array::BooleanArray);
impl_from_vector!(i32, arrow::array::Int32Array);
impl_from_vector!(i64, arrow::array::Int64Array);
impl_from_vector!(u32, arrow::array::UInt32Array);
impl_from_vector!(u64, arrow::array::UInt64Array);
impl_from_vector!(f32, arrow::array::Float32Array);
impl_from_vector!(f64, arrow::array::Float64Array);
impl_from_vector!(&str, arrow::array::StringArray);
