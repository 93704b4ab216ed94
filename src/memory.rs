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

//! Memory resources
//!
//! Operations request every buffer they produce (scratch and output) from a
//! [`MemoryResource`] before writing it. Requests are held by a [`Reservation`]
//! that returns the bytes to the resource when dropped.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use crate::ctx::Stream;
use crate::error::{CompactionError, CompactionResult};

static CURRENT_RESOURCE: OnceLock<RwLock<Arc<dyn MemoryResource>>> = OnceLock::new();

/// Allocator contract consumed by every operation
pub trait MemoryResource: Send + Sync + fmt::Debug {
    /// Reserve `bytes` for work on `stream`
    fn allocate(&self, bytes: usize, stream: &Stream) -> CompactionResult<()>;

    /// Return `bytes` previously reserved with [`allocate`](Self::allocate)
    fn deallocate(&self, bytes: usize, stream: &Stream);

    /// Bytes currently reserved
    fn allocated_bytes(&self) -> usize;
}

/// Default resource backed by the system allocator; tracks current and peak usage
#[derive(Debug, Default)]
pub struct SystemMemoryResource {
    allocated: AtomicUsize,
    peak: AtomicUsize,
}

impl SystemMemoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest number of bytes reserved at once
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

impl MemoryResource for SystemMemoryResource {
    fn allocate(&self, bytes: usize, _stream: &Stream) -> CompactionResult<()> {
        if bytes > isize::MAX as usize {
            return Err(CompactionError::AllocationFailure {
                bytes,
                reason: "request exceeds the addressable size".to_string(),
            });
        }
        let now = self.allocated.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak.fetch_max(now, Ordering::Relaxed);
        Ok(())
    }

    fn deallocate(&self, bytes: usize, _stream: &Stream) {
        release(&self.allocated, bytes);
    }

    fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}

/// Resource that refuses requests once a byte limit would be exceeded
#[derive(Debug)]
pub struct LimitingMemoryResource {
    limit: usize,
    allocated: AtomicUsize,
}

impl LimitingMemoryResource {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            allocated: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl MemoryResource for LimitingMemoryResource {
    fn allocate(&self, bytes: usize, stream: &Stream) -> CompactionResult<()> {
        let limit = self.limit;
        self.allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(bytes).filter(|total| *total <= limit)
            })
            .map(|_| ())
            .map_err(|current| CompactionError::AllocationFailure {
                bytes,
                reason: format!(
                    "limit of {} bytes reached ({} in use) on stream '{}'",
                    limit,
                    current,
                    stream.name()
                ),
            })
    }

    fn deallocate(&self, bytes: usize, _stream: &Stream) {
        release(&self.allocated, bytes);
    }

    fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }
}

fn release(counter: &AtomicUsize, bytes: usize) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
        Some(current.saturating_sub(bytes))
    });
}

/// Bytes held from a resource on behalf of a buffer
pub struct Reservation {
    bytes: usize,
    resource: Arc<dyn MemoryResource>,
    stream: Stream,
}

impl Reservation {
    /// Request `bytes` from `resource`; fails without side effects
    pub fn try_new(
        resource: &Arc<dyn MemoryResource>,
        bytes: usize,
        stream: &Stream,
    ) -> CompactionResult<Self> {
        resource.allocate(bytes, stream)?;
        Ok(Self {
            bytes,
            resource: Arc::clone(resource),
            stream: stream.clone(),
        })
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.resource.deallocate(self.bytes, &self.stream);
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("bytes", &self.bytes)
            .field("stream", &self.stream.name())
            .finish()
    }
}

fn current_resource_slot() -> &'static RwLock<Arc<dyn MemoryResource>> {
    CURRENT_RESOURCE.get_or_init(|| RwLock::new(Arc::new(SystemMemoryResource::new())))
}

/// The process-wide default memory resource (a [`SystemMemoryResource`] until replaced)
pub fn current_memory_resource() -> Arc<dyn MemoryResource> {
    Arc::clone(
        &current_resource_slot()
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner()),
    )
}

/// Replace the process-wide default memory resource, returning the previous one
pub fn set_current_memory_resource(resource: Arc<dyn MemoryResource>) -> Arc<dyn MemoryResource> {
    let mut slot = current_resource_slot()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::replace(&mut *slot, resource)
}
