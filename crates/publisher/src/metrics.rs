//! Publisher metrics for observability
//!
//! Shared between the publisher (owned by the capture callback) and the
//! host loop that reports on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Counters for one publisher
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// Frames handed to `on_frame`
    frames_received: AtomicU64,
    /// Frames withheld by the drop filter
    frames_filtered: AtomicU64,
    /// Frames written to the socket group
    frames_published: AtomicU64,
    /// Successful per-socket writes
    messages_sent: AtomicU64,
    /// Failed per-socket writes
    send_failures: AtomicU64,
    /// Message bytes written, counted once per frame
    bytes_published: AtomicU64,
    /// Index of the most recent frame
    last_frame_index: AtomicU64,
    /// Wall-clock time of the most recent frame (ms since epoch)
    last_write_unix_ms: AtomicU64,
}

impl PublisherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame arriving
    pub fn record_received(&self, frame_index: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.last_frame_index.store(frame_index, Ordering::Relaxed);
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.last_write_unix_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Increment filtered count
    pub fn inc_filtered(&self) {
        self.frames_filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one fan-out
    pub fn record_fan_out(&self, bytes: usize, sent: usize, failed: usize) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
        self.bytes_published.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_sent.fetch_add(sent as u64, Ordering::Relaxed);
        self.send_failures.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn frames_filtered(&self) -> u64 {
        self.frames_filtered.load(Ordering::Relaxed)
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received(),
            frames_filtered: self.frames_filtered(),
            frames_published: self.frames_published(),
            messages_sent: self.messages_sent(),
            send_failures: self.send_failures(),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
            last_frame_index: self.last_frame_index.load(Ordering::Relaxed),
            last_write_unix_ms: self.last_write_unix_ms.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of publisher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_filtered: u64,
    pub frames_published: u64,
    pub messages_sent: u64,
    pub send_failures: u64,
    pub bytes_published: u64,
    pub last_frame_index: u64,
    pub last_write_unix_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = PublisherMetrics::new();
        metrics.record_received(5);
        metrics.record_received(6);
        metrics.inc_filtered();
        metrics.record_fan_out(100, 2, 1);

        let snap = metrics.snapshot();
        assert_eq!(snap.frames_received, 2);
        assert_eq!(snap.frames_filtered, 1);
        assert_eq!(snap.frames_published, 1);
        assert_eq!(snap.messages_sent, 2);
        assert_eq!(snap.send_failures, 1);
        assert_eq!(snap.bytes_published, 100);
        assert_eq!(snap.last_frame_index, 6);
        assert!(snap.last_write_unix_ms > 0);
    }
}
