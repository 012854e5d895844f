//! Broadcaster run statistics.

use std::net::SocketAddr;
use std::time::Duration;

use observability::ThroughputAggregator;
use publisher::MetricsSnapshot;

/// Why the host loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl+C or SIGTERM
    Signal,
    /// `--timeout` elapsed
    Timeout,
    /// The source stopped by itself (e.g. `--max-frames`)
    SourceFinished,
}

/// Statistics from a broadcaster run
#[derive(Debug, Clone)]
pub struct BroadcastStats {
    pub hostname: String,
    pub endpoints: Vec<SocketAddr>,
    pub stop_reason: StopReason,
    pub duration: Duration,
    /// Publisher counters at shutdown
    pub publisher: MetricsSnapshot,
    /// Messages skipped by slow subscribers
    pub lagged_messages: u64,
    pub throughput: ThroughputAggregator,
}

impl BroadcastStats {
    /// Published frames per second over the whole run
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.publisher.frames_published as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received frames withheld by the drop filter, in percent
    pub fn filtered_rate(&self) -> f64 {
        if self.publisher.frames_received > 0 {
            self.publisher.frames_filtered as f64 / self.publisher.frames_received as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                   Broadcaster Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Host: {}", self.hostname);
        println!("   ├─ Stopped by: {:?}", self.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   └─ FPS: {:.2}", self.fps());

        let p = &self.publisher;
        println!("\n📤 Publisher");
        println!("   ├─ Frames received: {}", p.frames_received);
        println!(
            "   ├─ Frames filtered: {} ({:.2}%)",
            p.frames_filtered,
            self.filtered_rate()
        );
        println!("   ├─ Frames published: {}", p.frames_published);
        println!("   ├─ Bytes published: {}", p.bytes_published);
        println!("   ├─ Socket writes: {} ok, {} failed", p.messages_sent, p.send_failures);
        println!("   ├─ Lagged messages: {}", self.lagged_messages);
        println!("   └─ Last frame index: {}", p.last_frame_index);

        println!("\n🔌 Endpoints ({})", self.endpoints.len());
        for (i, addr) in self.endpoints.iter().enumerate() {
            let prefix = if i + 1 == self.endpoints.len() { "└─" } else { "├─" };
            println!("   {} tcp://{}", prefix, addr);
        }

        let summary = self.throughput.summary();
        println!("\n📈 Throughput");
        println!("   ├─ Frames/s: {}", summary.fps);
        println!("   ├─ MB/s: {}", summary.mbps);
        println!("   └─ Subscribers: {}", summary.subscribers);

        println!();
    }
}
