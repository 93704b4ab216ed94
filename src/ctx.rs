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

//! Execution streams
//!
//! A [`Stream`] is an ordered command queue. Work enqueued on one stream runs in
//! submission order; work on different streams runs concurrently. Every stream
//! carries a [`CompactionConfig`] and may own a dedicated rayon pool that the
//! data-parallel kernels of its operations run on.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, OnceLock, RwLock};

use crate::config::CompactionConfig;
use crate::error::{CompactionError, CompactionResult};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(0);

static DEFAULT_STREAM: OnceLock<RwLock<Stream>> = OnceLock::new();

thread_local! {
    /// Streams whose queued work is executing on this thread
    static ACTIVE_STREAMS: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct StreamInner {
    id: u64,
    name: String,
    config: CompactionConfig,
    pool: Option<rayon::ThreadPool>,
    next_ticket: AtomicU64,
    serving: Mutex<u64>,
    turn: Condvar,
    fault: Mutex<Option<String>>,
}

/// Releases the stream to the next ticket holder when dropped
struct Turn<'a> {
    inner: &'a StreamInner,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        let mut serving = lock(&self.inner.serving);
        *serving += 1;
        self.inner.turn.notify_all();
    }
}

impl StreamInner {
    fn take_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst)
    }

    fn wait_turn(&self, ticket: u64) -> Turn<'_> {
        let mut serving = lock(&self.serving);
        while *serving != ticket {
            serving = self
                .turn
                .wait(serving)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        Turn { inner: self }
    }

    fn is_active_on_current_thread(&self) -> bool {
        ACTIVE_STREAMS.with(|active| active.borrow().contains(&self.id))
    }

    /// Run `f` as this stream's current work item. Panics become execution faults.
    fn execute<R, F>(&self, label: &str, f: F) -> CompactionResult<R>
    where
        R: Send,
        F: FnOnce() -> CompactionResult<R> + Send,
    {
        let id = self.id;
        let tracked = move || {
            ACTIVE_STREAMS.with(|active| active.borrow_mut().push(id));
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            ACTIVE_STREAMS.with(|active| {
                let mut active = active.borrow_mut();
                if let Some(pos) = active.iter().rposition(|s| *s == id) {
                    active.remove(pos);
                }
            });
            outcome
        };

        compaction_trace!("stream '{}' executing {}", self.name, label);
        let outcome = match &self.pool {
            Some(pool) => pool.install(tracked),
            None => tracked(),
        };

        match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    format!("{} panicked: {}", label, s)
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    format!("{} panicked: {}", label, s)
                } else {
                    format!("{} panicked", label)
                };
                compaction_warn!("stream '{}' fault: {}", self.name, message);
                let mut fault = lock(&self.fault);
                if fault.is_none() {
                    *fault = Some(message.clone());
                }
                Err(CompactionError::ExecutionFault {
                    stream: self.name.clone(),
                    message,
                })
            }
        }
    }
}

/// Ordered execution queue shared by reference; clones refer to the same queue.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<StreamInner>,
}

impl Stream {
    /// Create a stream with the default configuration on the global rayon pool
    pub fn new(name: impl Into<String>) -> CompactionResult<Self> {
        Self::with_config(name, CompactionConfig::default())
    }

    /// Create a stream with an explicit configuration.
    ///
    /// When `config.num_threads` is set the stream gets its own thread pool.
    pub fn with_config(name: impl Into<String>, config: CompactionConfig) -> CompactionResult<Self> {
        config.validate()?;
        let name = name.into();
        let pool = match config.num_threads {
            Some(threads) => {
                let prefix = name.clone();
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(move |i| format!("{}-{}", prefix, i))
                    .build()
                    .map_err(|e| {
                        CompactionError::Invalid(format!(
                            "failed to build thread pool for stream '{}': {}",
                            name, e
                        ))
                    })?;
                Some(pool)
            }
            None => None,
        };
        Ok(Self::from_parts(name, config, pool))
    }

    fn from_parts(name: String, config: CompactionConfig, pool: Option<rayon::ThreadPool>) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
                name,
                config,
                pool,
                next_ticket: AtomicU64::new(0),
                serving: Mutex::new(0),
                turn: Condvar::new(),
                fault: Mutex::new(None),
            }),
        }
    }

    /// Unique id of this stream
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Name used in logs and fault reports
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Kernel configuration of this stream
    pub fn config(&self) -> &CompactionConfig {
        &self.inner.config
    }

    /// Number of worker threads the stream's kernels can use
    pub fn num_threads(&self) -> usize {
        match &self.inner.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Enqueue `f` and block until it has run.
    ///
    /// Work already queued on this stream runs first. Called from inside work
    /// executing on this same stream, `f` runs inline.
    pub fn launch<R, F>(&self, label: &str, f: F) -> CompactionResult<R>
    where
        R: Send,
        F: FnOnce() -> CompactionResult<R> + Send,
    {
        if self.inner.is_active_on_current_thread() {
            return self.inner.execute(label, f);
        }
        let ticket = self.inner.take_ticket();
        let _turn = self.inner.wait_turn(ticket);
        self.inner.execute(label, f)
    }

    /// Enqueue owned work and return immediately.
    ///
    /// The result is collected with [`Pending::wait`].
    pub fn submit<T, F>(&self, label: &str, f: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce() -> CompactionResult<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let ticket = self.inner.take_ticket();
        let inner = Arc::clone(&self.inner);
        let owned_label = label.to_string();

        let spawned = std::thread::Builder::new()
            .name(format!("{}-q{}", self.inner.name, ticket))
            .spawn(move || {
                let result = {
                    let _turn = inner.wait_turn(ticket);
                    inner.execute(&owned_label, f)
                };
                // the receiver may have been dropped; the work still ran in order
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            compaction_warn!(
                "stream '{}' could not spawn worker for {}: {}",
                self.inner.name,
                label,
                e
            );
            // consume the ticket so later work is not stalled
            drop(self.inner.wait_turn(ticket));
            let mut fault = lock(&self.inner.fault);
            if fault.is_none() {
                *fault = Some(format!("failed to enqueue {}: {}", label, e));
            }
        }

        Pending {
            rx,
            stream: self.inner.name.clone(),
        }
    }

    /// Record an event that completes once all work queued so far has run
    pub fn record_event(&self) -> Event {
        let event = Event::new();
        let signal = event.clone();
        drop(self.submit("record_event", move || {
            signal.signal();
            Ok(())
        }));
        event
    }

    /// Make work queued after this call wait until `event` completes
    pub fn wait_event(&self, event: &Event) {
        let event = event.clone();
        drop(self.submit("wait_event", move || {
            event.wait();
            Ok(())
        }));
    }

    /// Block until every item queued so far has run.
    ///
    /// Reports (and clears) the first execution fault recorded on the stream.
    pub fn synchronize(&self) -> CompactionResult<()> {
        if !self.inner.is_active_on_current_thread() {
            let ticket = self.inner.take_ticket();
            drop(self.inner.wait_turn(ticket));
        }
        match lock(&self.inner.fault).take() {
            Some(message) => Err(CompactionError::ExecutionFault {
                stream: self.inner.name.clone(),
                message,
            }),
            None => Ok(()),
        }
    }
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Stream {}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Result of work enqueued with [`Stream::submit`]
pub struct Pending<T> {
    rx: mpsc::Receiver<CompactionResult<T>>,
    stream: String,
}

impl<T> Pending<T> {
    /// Block until the work has run and return its result
    pub fn wait(self) -> CompactionResult<T> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(CompactionError::ExecutionFault {
                stream: self.stream,
                message: "queued work terminated without producing a result".to_string(),
            }),
        }
    }
}

/// Completion marker used to order work across streams
#[derive(Clone, Default)]
pub struct Event {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Event {
    fn new() -> Self {
        Self::default()
    }

    fn signal(&self) {
        let (done, cv) = &*self.state;
        *lock(done) = true;
        cv.notify_all();
    }

    /// Block until the event completes
    pub fn wait(&self) {
        let (done, cv) = &*self.state;
        let mut done = lock(done);
        while !*done {
            done = cv.wait(done).unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Whether the event has completed
    pub fn is_complete(&self) -> bool {
        *lock(&self.state.0)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("complete", &self.is_complete())
            .finish()
    }
}

fn create_default_stream() -> Stream {
    let config = CompactionConfig::from_env();
    match Stream::with_config("default", config.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            compaction_warn!("default stream falls back to the global pool: {}", e);
            Stream::from_parts(
                "default".to_string(),
                CompactionConfig {
                    num_threads: None,
                    ..config
                },
                None,
            )
        }
    }
}

fn default_stream_slot() -> &'static RwLock<Stream> {
    DEFAULT_STREAM.get_or_init(|| RwLock::new(create_default_stream()))
}

/// The process-wide default stream, created from the environment on first use
pub fn default_stream() -> Stream {
    default_stream_slot()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Replace the process-wide default stream, returning the previous one
pub fn set_default_stream(stream: Stream) -> Stream {
    let mut slot = default_stream_slot()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::replace(&mut *slot, stream)
}
