//! Broadcaster metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op, so the publish path can call them unconditionally.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// A frame arrived from the capture device
pub fn record_frame_received() {
    counter!("frame_broadcaster_frames_received_total").increment(1);
}

/// A frame was withheld by the drop filter
pub fn record_frame_filtered() {
    counter!("frame_broadcaster_frames_filtered_total").increment(1);
}

/// A frame was written to the socket group
pub fn record_frame_published(bytes: usize, subscribers: usize) {
    counter!("frame_broadcaster_frames_published_total").increment(1);
    counter!("frame_broadcaster_bytes_published_total").increment(bytes as u64);
    histogram!("frame_broadcaster_message_bytes").record(bytes as f64);
    gauge!("frame_broadcaster_subscribers_reached").set(subscribers as f64);
}

/// Socket writes that failed during one fan-out
pub fn record_send_failures(failed: usize) {
    counter!("frame_broadcaster_send_failures_total").increment(failed as u64);
}

/// Time between two consecutive frame callbacks
pub fn record_frame_interval(interval: Duration) {
    histogram!("frame_broadcaster_frame_interval_ms").record(interval.as_secs_f64() * 1000.0);
}

pub fn record_subscriber_connected() {
    counter!("frame_broadcaster_subscribers_connected_total").increment(1);
    gauge!("frame_broadcaster_subscribers").increment(1.0);
}

pub fn record_subscriber_disconnected() {
    gauge!("frame_broadcaster_subscribers").decrement(1.0);
}

/// Messages a slow subscriber skipped
pub fn record_subscriber_lag(skipped: u64) {
    counter!("frame_broadcaster_subscriber_lagged_messages_total").increment(skipped);
}

/// Aggregates periodic throughput samples for the run summary
#[derive(Debug, Clone, Default)]
pub struct ThroughputAggregator {
    /// Frames per second, one sample per window
    pub fps: RunningStats,
    /// Megabytes per second, one sample per window
    pub mbps: RunningStats,
    /// Subscribers observed at the end of each window
    pub subscribers: RunningStats,
    /// Total covered time
    pub elapsed: Duration,
}

impl ThroughputAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one reporting window
    ///
    /// Empty windows are ignored.
    pub fn push_window(&mut self, frames: u64, bytes: u64, subscribers: usize, window: Duration) {
        let secs = window.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        self.fps.push(frames as f64 / secs);
        self.mbps.push(bytes as f64 / secs / 1_000_000.0);
        self.subscribers.push(subscribers as f64);
        self.elapsed += window;
    }

    pub fn summary(&self) -> ThroughputSummary {
        ThroughputSummary {
            windows: self.fps.count(),
            elapsed: self.elapsed,
            fps: StatsSummary::from(&self.fps),
            mbps: StatsSummary::from(&self.mbps),
            subscribers: StatsSummary::from(&self.subscribers),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Throughput summary
#[derive(Debug, Clone, Default)]
pub struct ThroughputSummary {
    pub windows: u64,
    pub elapsed: Duration,
    pub fps: StatsSummary,
    pub mbps: StatsSummary,
    pub subscribers: StatsSummary,
}

impl std::fmt::Display for ThroughputSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Throughput Summary ===")?;
        writeln!(
            f,
            "Windows: {} ({:.2}s)",
            self.windows,
            self.elapsed.as_secs_f64()
        )?;
        writeln!(f, "Frames/s: {}", self.fps)?;
        writeln!(f, "MB/s: {}", self.mbps)?;
        writeln!(f, "Subscribers: {}", self.subscribers)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
