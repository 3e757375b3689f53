//! Background-flushing channel writer
//!
//! [`ChannelWriter`] copies each write into a bounded queue and returns; a
//! dedicated thread drains the queue into the wrapped [`Sink`] in FIFO order
//! and flushes it on a fixed interval. Producers never perform sink I/O, so
//! a slow disk cannot stall the code that logs.
//!
//! Lifecycle is `Running → Stopping → Stopped`. [`ChannelWriter::stop`]
//! refuses new writes, waits for every queued buffer to reach the sink,
//! flushes once more and joins the thread. It is safe to call any number of
//! times from any number of threads; every call returns only once the drain
//! has completed.

use super::Sink;
use crate::core::error::{LoggerError, Result};
use crate::core::metrics::{should_alert, WriterMetrics};
use crate::core::overflow_policy::OverflowPolicy;
use crossbeam_channel::{bounded, select, tick, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default queue capacity, in buffers
pub const DEFAULT_CAPACITY: usize = 256;

/// Default interval between background flushes
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle state of a [`ChannelWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting writes
    Running,
    /// No longer accepting writes; the queue is being drained
    Stopping,
    /// Drained, flushed and joined
    Stopped,
}

/// Builder for [`ChannelWriter`]
///
/// # Example
///
/// ```
/// use repo_logger::appenders::ChannelWriter;
/// use repo_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// let writer = ChannelWriter::builder()
///     .capacity(1024)
///     .flush_interval(Duration::from_millis(200))
///     .overflow_policy(OverflowPolicy::Block)
///     .build(Vec::<u8>::new())
///     .unwrap();
/// writer.write(b"hello\n").unwrap();
/// writer.stop();
/// ```
#[derive(Debug, Clone)]
pub struct ChannelWriterBuilder {
    capacity: usize,
    flush_interval: Duration,
    overflow_policy: OverflowPolicy,
    thread_name: String,
}

impl Default for ChannelWriterBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            overflow_policy: OverflowPolicy::default(),
            thread_name: "channel-writer".to_string(),
        }
    }
}

impl ChannelWriterBuilder {
    /// Maximum number of queued buffers
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Start the background thread writing to `sink`
    ///
    /// # Errors
    ///
    /// Returns an error if the flush interval is zero or the thread cannot
    /// be spawned.
    pub fn build<S: Sink + 'static>(self, sink: S) -> Result<ChannelWriter> {
        if self.flush_interval.is_zero() {
            return Err(LoggerError::config(
                "ChannelWriter",
                "flush interval must be greater than zero",
            ));
        }

        let (sender, receiver) = bounded::<Vec<u8>>(self.capacity);
        let (done_tx, done_rx) = bounded::<()>(0);
        let metrics = Arc::new(WriterMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let interval = self.flush_interval;
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                run_worker(sink, receiver, interval, &worker_metrics);
                // Dropping the last sender tells every `stop` caller the drain is done
                drop(done_tx);
            })
            .map_err(|e| {
                LoggerError::io_operation(
                    "spawning channel writer thread",
                    format!("cannot start thread '{}'", self.thread_name),
                    e,
                )
            })?;

        Ok(ChannelWriter {
            inner: Arc::new(Inner {
                sender: RwLock::new(Some(sender)),
                state: AtomicU8::new(RUNNING),
                capacity: self.capacity,
                policy: self.overflow_policy,
                metrics,
                done: done_rx,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }
}

/// Bounded, background-flushing writer around a [`Sink`]
///
/// Cloning is cheap; all clones feed the same queue and thread.
#[derive(Clone)]
pub struct ChannelWriter {
    inner: Arc<Inner>,
}

struct Inner {
    sender: RwLock<Option<Sender<Vec<u8>>>>,
    state: AtomicU8,
    capacity: usize,
    policy: OverflowPolicy,
    metrics: Arc<WriterMetrics>,
    /// Disconnected once the worker has drained the queue and flushed
    done: Receiver<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelWriter {
    /// Start a writer with the given queue capacity and flush interval and
    /// the default (blocking) overflow policy.
    pub fn new<S: Sink + 'static>(sink: S, capacity: usize, flush_interval: Duration) -> Result<Self> {
        Self::builder()
            .capacity(capacity)
            .flush_interval(flush_interval)
            .build(sink)
    }

    pub fn builder() -> ChannelWriterBuilder {
        ChannelWriterBuilder::default()
    }

    /// Queue a copy of `buf` for the background thread.
    ///
    /// Never touches the sink. When the queue is full the overflow policy
    /// decides between waiting and refusing the write.
    ///
    /// # Errors
    ///
    /// [`LoggerError::WriterStopped`] once [`stop`](Self::stop) has begun;
    /// [`LoggerError::QueueFull`] when the policy refuses the write.
    pub fn write(&self, buf: &[u8]) -> Result<()> {
        let guard = self.inner.sender.read();
        let sender = guard.as_ref().ok_or(LoggerError::WriterStopped)?;
        // Stopping but the sender not yet taken
        if self.inner.state.load(Ordering::Acquire) != RUNNING {
            return Err(LoggerError::WriterStopped);
        }
        self.inner.enqueue(sender, buf.to_vec())
    }

    /// Stop accepting writes, drain the queue into the sink, flush it and
    /// join the background thread.
    ///
    /// Repeated and concurrent calls are no-ops that also wait for the
    /// drain to finish.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Whether the writer has stopped accepting writes. Never blocks.
    pub fn is_stopped(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != RUNNING
    }

    pub fn state(&self) -> WriterState {
        match self.inner.state.load(Ordering::Acquire) {
            RUNNING => WriterState::Running,
            STOPPING => WriterState::Stopping,
            _ => WriterState::Stopped,
        }
    }

    /// Buffers waiting in the queue
    pub fn queued(&self) -> usize {
        self.inner.sender.read().as_ref().map_or(0, Sender::len)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.inner.policy
    }

    pub fn metrics(&self) -> &WriterMetrics {
        &self.inner.metrics
    }
}

impl Inner {
    fn enqueue(&self, sender: &Sender<Vec<u8>>, data: Vec<u8>) -> Result<()> {
        let data = match sender.try_send(data) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Disconnected(_)) => return Err(LoggerError::WriterStopped),
            Err(TrySendError::Full(data)) => data,
        };

        match self.policy {
            OverflowPolicy::Block => {
                self.metrics.record_block();
                sender.send(data).map_err(|_| LoggerError::WriterStopped)
            }
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(data, timeout) {
                    Ok(()) => Ok(()),
                    Err(SendTimeoutError::Timeout(_)) => Err(self.refuse(sender)),
                    Err(SendTimeoutError::Disconnected(_)) => Err(LoggerError::WriterStopped),
                }
            }
            OverflowPolicy::DropNewest => Err(self.refuse(sender)),
        }
    }

    fn refuse(&self, sender: &Sender<Vec<u8>>) -> LoggerError {
        let dropped = self.metrics.record_dropped();
        if should_alert(dropped) {
            eprintln!(
                "[LOGGER WARNING] Channel writer queue full, {} buffers refused. \
                 Consider increasing capacity or using OverflowPolicy::Block.",
                dropped + 1
            );
        }
        LoggerError::queue_full(sender.len(), self.capacity)
    }

    fn stop(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire);

        // Waits for in-flight writes to finish; later writes see `None`
        drop(self.sender.write().take());

        // Err(Disconnected) once the worker is done
        let _ = self.done.recv();

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                eprintln!("[LOGGER ERROR] Channel writer thread panicked during shutdown");
            }
        }
        self.state.store(STOPPED, Ordering::Release);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ChannelWriter::write(self, buf)?;
        Ok(buf.len())
    }

    /// No-op: the background thread flushes on its own schedule and on stop
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for ChannelWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("state", &self.state())
            .field("capacity", &self.inner.capacity)
            .field("policy", &self.inner.policy)
            .finish()
    }
}

fn run_worker<S: Sink>(
    mut sink: S,
    receiver: Receiver<Vec<u8>>,
    interval: Duration,
    metrics: &WriterMetrics,
) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(receiver) -> msg => match msg {
                Ok(buf) => write_to_sink(&mut sink, &buf, metrics),
                // All senders gone and the queue is empty
                Err(_) => break,
            },
            recv(ticker) -> _ => flush_sink(&mut sink, metrics),
        }
    }
    flush_sink(&mut sink, metrics);
}

fn write_to_sink<S: Sink>(sink: &mut S, buf: &[u8], metrics: &WriterMetrics) {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.write(buf))) {
        Ok(Ok(())) => {
            metrics.record_written(buf.len());
        }
        Ok(Err(e)) => {
            let failed = metrics.record_failed();
            if should_alert(failed) {
                eprintln!(
                    "[LOGGER ERROR] Channel writer sink failed ({} failures so far): {}",
                    failed + 1,
                    e
                );
            }
        }
        Err(panic_info) => {
            let failed = metrics.record_failed();
            if should_alert(failed) {
                eprintln!(
                    "[LOGGER CRITICAL] Channel writer sink panicked: {}. \
                     The writer continues with the next buffer.",
                    panic_message(&panic_info)
                );
            }
        }
    }
}

fn flush_sink<S: Sink>(sink: &mut S, metrics: &WriterMetrics) {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.flush())) {
        Ok(None) => {}
        Ok(Some(Ok(()))) => {
            metrics.record_flush();
        }
        Ok(Some(Err(e))) => {
            if should_alert(metrics.record_flush_failure()) {
                eprintln!("[LOGGER ERROR] Channel writer sink flush failed: {}", e);
            }
        }
        Err(panic_info) => {
            if should_alert(metrics.record_flush_failure()) {
                eprintln!(
                    "[LOGGER CRITICAL] Channel writer sink panicked during flush: {}",
                    panic_message(&panic_info)
                );
            }
        }
    }
}

fn panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
