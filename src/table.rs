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

//! Table - the row-oriented view over a set of equal-length columns

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, RecordBatch};
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;

use crate::error::{CompactionError, CompactionResult};
use crate::memory::Reservation;

pub mod column;
pub use column::Column;

/// Ordered columns sharing a row count, stored as one or more record batches.
///
/// Tables produced by compaction operations hold the memory reservation for
/// their buffers; it is released when the last clone is dropped.
#[derive(Clone, Debug)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    reservation: Option<Arc<Reservation>>,
}

impl Table {
    /// Create a table from Arrow RecordBatch
    pub fn from_record_batch(batch: RecordBatch) -> CompactionResult<Self> {
        Ok(Self {
            schema: batch.schema(),
            batches: vec![batch],
            reservation: None,
        })
    }

    /// Create a table from multiple Arrow RecordBatches sharing one schema
    pub fn from_record_batches(batches: Vec<RecordBatch>) -> CompactionResult<Self> {
        let schema = batches
            .first()
            .map(|b| b.schema())
            .ok_or_else(|| CompactionError::Invalid("Table needs at least one batch".to_string()))?;
        Self::try_new(schema, batches)
    }

    /// Create a table with an explicit schema; `batches` may be empty
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> CompactionResult<Self> {
        for (i, batch) in batches.iter().enumerate() {
            if batch.schema().fields() != schema.fields() {
                return Err(CompactionError::Invalid(format!(
                    "batch {} schema does not match the table schema",
                    i
                )));
            }
        }
        Ok(Self {
            schema,
            batches,
            reservation: None,
        })
    }

    /// Create a table from named columns
    pub fn from_columns<N: AsRef<str>>(columns: Vec<(N, ArrayRef)>) -> CompactionResult<Self> {
        let batch = RecordBatch::try_from_iter(columns)?;
        Self::from_record_batch(batch)
    }

    /// Table with no rows
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
            reservation: None,
        }
    }

    pub(crate) fn with_reservation(batch: RecordBatch, reservation: Reservation) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
            reservation: Some(Arc::new(reservation)),
        }
    }

    /// Get the number of columns
    pub fn columns(&self) -> usize {
        self.schema.fields().len()
    }

    /// Get the number of rows
    pub fn rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    /// Check if table is empty
    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Get the schema
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<String> {
        self.schema.fields().iter().map(|f| f.name().clone()).collect()
    }

    /// Get the number of batches in the table
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Get a specific batch by index
    pub fn batch(&self, index: usize) -> Option<&RecordBatch> {
        self.batches.get(index)
    }

    /// Get all batches
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Bytes reserved for this table's buffers, if it was produced by an operation
    pub fn reserved_bytes(&self) -> usize {
        self.reservation.as_ref().map_or(0, |r| r.bytes())
    }

    /// All rows as a single batch; a single-batch table is returned without copying
    pub fn combined_batch(&self) -> CompactionResult<RecordBatch> {
        match self.batches.len() {
            0 => Ok(RecordBatch::new_empty(self.schema.clone())),
            1 => Ok(self.batches[0].clone()),
            _ => Ok(concat_batches(&self.schema, &self.batches)?),
        }
    }

    /// Check every index refers to a column of this table
    pub fn validate_column_indices(&self, indices: &[usize]) -> CompactionResult<()> {
        let num_columns = self.columns();
        match indices.iter().find(|&&index| index >= num_columns) {
            Some(&index) => Err(CompactionError::InvalidColumnIndex { index, num_columns }),
            None => Ok(()),
        }
    }

    /// Column `index` with all batches combined
    pub fn column(&self, index: usize) -> CompactionResult<Column> {
        self.validate_column_indices(&[index])?;
        let batch = self.combined_batch()?;
        Ok(Column::new(batch.column(index).clone()))
    }

    /// Project the table to the given column indices
    pub fn project(&self, column_indices: &[usize]) -> CompactionResult<Table> {
        self.validate_column_indices(column_indices)?;
        let schema = Arc::new(self.schema.project(column_indices)?);
        let batches = self
            .batches
            .iter()
            .map(|batch| batch.project(column_indices))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            schema,
            batches,
            reservation: self.reservation.clone(),
        })
    }

    /// Keep the rows where `mask` is valid and true
    pub fn select(&self, mask: &BooleanArray) -> CompactionResult<Table> {
        let mask = Column::new(Arc::new(mask.clone()));
        crate::stream_compaction::apply_boolean_mask(self, &mask)
    }
}
