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

//! Error handling for compaction operations

use std::fmt;

/// Coarse error classification, stable across releases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Ok = 0,
    OutOfMemory = 1,
    TypeError = 3,
    Invalid = 4,
    IndexError = 7,
    ValueError = 14,
    ExecutionError = 42,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Ok => write!(f, "OK"),
            Code::OutOfMemory => write!(f, "Out of memory"),
            Code::TypeError => write!(f, "Type error"),
            Code::Invalid => write!(f, "Invalid"),
            Code::IndexError => write!(f, "Index error"),
            Code::ValueError => write!(f, "Value error"),
            Code::ExecutionError => write!(f, "Execution error"),
        }
    }
}

/// Main error type for compaction operations
#[derive(thiserror::Error, Debug)]
pub enum CompactionError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Column index {index} out of range for table with {num_columns} columns")]
    InvalidColumnIndex { index: usize, num_columns: usize },

    #[error("keep_threshold {threshold} outside [0, {num_keys}]")]
    InvalidThreshold { threshold: usize, num_keys: usize },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Row count mismatch: expected {expected} rows, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("Allocation of {bytes} bytes failed: {reason}")]
    AllocationFailure { bytes: usize, reason: String },

    #[error("Execution fault on stream '{stream}': {message}")]
    ExecutionFault { stream: String, message: String },

    #[error("Invalid operation: {0}")]
    Invalid(String),
}

impl CompactionError {
    /// Get the error code
    pub fn code(&self) -> Code {
        match self {
            CompactionError::Arrow(_) => Code::ExecutionError,
            CompactionError::InvalidColumnIndex { .. } => Code::IndexError,
            CompactionError::InvalidThreshold { .. } => Code::ValueError,
            CompactionError::TypeMismatch(_) => Code::TypeError,
            CompactionError::RowCountMismatch { .. } => Code::Invalid,
            CompactionError::AllocationFailure { .. } => Code::OutOfMemory,
            CompactionError::ExecutionFault { .. } => Code::ExecutionError,
            CompactionError::Invalid(_) => Code::Invalid,
        }
    }

    /// Whether the error was raised by argument validation, before any work was queued
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            CompactionError::InvalidColumnIndex { .. }
                | CompactionError::InvalidThreshold { .. }
                | CompactionError::TypeMismatch(_)
                | CompactionError::RowCountMismatch { .. }
                | CompactionError::Invalid(_)
        )
    }
}

/// Type alias for Results using CompactionError
pub type CompactionResult<T> = Result<T, CompactionError>;
