//! Channel writer metrics
//!
//! Counters describing what a [`ChannelWriter`](crate::appenders::ChannelWriter)
//! did with the buffers handed to it. Sink failures never reach producers,
//! so these counters are how they become visible.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one channel writer
///
/// # Example
///
/// ```
/// use repo_logger::WriterMetrics;
///
/// let metrics = WriterMetrics::new();
/// metrics.record_written(128);
/// metrics.record_failed();
///
/// assert_eq!(metrics.written_count(), 1);
/// assert_eq!(metrics.written_bytes(), 128);
/// assert_eq!(metrics.failed_count(), 1);
/// ```
#[derive(Debug)]
pub struct WriterMetrics {
    /// Buffers written to the sink
    written_count: AtomicU64,

    /// Bytes written to the sink
    written_bytes: AtomicU64,

    /// Buffers the sink rejected or panicked on
    failed_count: AtomicU64,

    /// Buffers refused because the queue was full
    dropped_count: AtomicU64,

    /// Times a producer had to wait for queue space
    block_events: AtomicU64,

    /// Successful sink flushes
    flush_count: AtomicU64,

    /// Sink flushes that failed
    flush_failures: AtomicU64,
}

impl WriterMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            written_count: AtomicU64::new(0),
            written_bytes: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn written_count(&self) -> u64 {
        self.written_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn written_bytes(&self) -> u64 {
        self.written_bytes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    /// Record a buffer written to the sink
    #[inline]
    pub fn record_written(&self, bytes: usize) -> u64 {
        self.written_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.written_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a failed sink write, returning the previous failure count
    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a buffer refused on a full queue, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush(&self) -> u64 {
        self.flush_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush_failure(&self) -> u64 {
        self.flush_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of buffers that never reached the sink, as a percentage
    /// (0.0 - 100.0). Returns 0.0 if nothing has been handled yet.
    pub fn loss_rate(&self) -> f64 {
        let lost = (self.failed_count() + self.dropped_count()) as f64;
        let total = self.written_count() as f64 + lost;
        if total == 0.0 {
            0.0
        } else {
            (lost / total) * 100.0
        }
    }
}

impl Default for WriterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WriterMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            written_count: AtomicU64::new(self.written_count()),
            written_bytes: AtomicU64::new(self.written_bytes()),
            failed_count: AtomicU64::new(self.failed_count()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            block_events: AtomicU64::new(self.block_events()),
            flush_count: AtomicU64::new(self.flush_count()),
            flush_failures: AtomicU64::new(self.flush_failures()),
        }
    }
}

/// Whether the `n`th occurrence (0-based) of a background failure should
/// be reported: the first one and every 1000th after it.
#[inline]
pub(crate) fn should_alert(previous: u64) -> bool {
    previous == 0 || (previous + 1) % 1000 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = WriterMetrics::new();
        assert_eq!(metrics.written_count(), 0);
        assert_eq!(metrics.failed_count(), 0);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.block_events(), 0);
        assert_eq!(metrics.flush_count(), 0);
    }

    #[test]
    fn test_metrics_record() {
        let metrics = WriterMetrics::new();
        assert_eq!(metrics.record_failed(), 0); // Returns previous value
        assert_eq!(metrics.failed_count(), 1);

        metrics.record_written(10);
        metrics.record_written(5);
        assert_eq!(metrics.written_count(), 2);
        assert_eq!(metrics.written_bytes(), 15);
    }

    #[test]
    fn test_loss_rate() {
        let metrics = WriterMetrics::new();
        assert_eq!(metrics.loss_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_written(1);
        }
        for _ in 0..5 {
            metrics.record_failed();
            metrics.record_dropped();
        }
        let rate = metrics.loss_rate();
        assert!(rate > 9.9 && rate < 10.1, "Loss rate was {}", rate);
    }

    #[test]
    fn test_should_alert() {
        assert!(should_alert(0));
        assert!(!should_alert(1));
        assert!(should_alert(999));
        assert!(!should_alert(1000));
        assert!(should_alert(1999));
    }

    #[test]
    fn test_metrics_clone() {
        let metrics = WriterMetrics::new();
        metrics.record_dropped();

        let snapshot = metrics.clone();
        metrics.record_dropped();
        assert_eq!(metrics.dropped_count(), 2);
        assert_eq!(snapshot.dropped_count(), 1);
    }
}
