//! Broadcaster orchestrator - wires capture, publisher and endpoints together.
//!
//! Lifecycle: bind endpoints, start the source with the publisher as its
//! callback, wait for a stop condition, stop the source. Stopping the source
//! joins its thread, which drops the publisher and closes the endpoints
//! after the last write.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use capture::SyntheticCamera;
use contracts::{BroadcasterBlueprint, FrameSource};
use observability::ThroughputAggregator;
use publisher::{
    FramePublisher, MetadataAnnotator, MetricsSnapshot, PublisherMetrics, SocketGroup,
    SocketGroupConfig, SubscriberProbe, TcpPubSocket,
};
use tracing::{info, instrument, warn};

use super::{BroadcastStats, HostIdentity, StopReason};
use crate::error::{CliError, Result};

/// How often the host loop checks whether the source is still running
const SOURCE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Broadcaster configuration
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Validated configuration (CLI overrides applied)
    pub blueprint: BroadcasterBlueprint,

    /// Stop after this many captured frames (None = unlimited)
    pub max_frames: Option<u64>,

    /// Stop after this long (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Period of throughput reports
    pub report_interval: Duration,
}

/// Main broadcaster host loop
pub struct Broadcaster {
    config: BroadcasterConfig,
}

impl Broadcaster {
    pub fn new(config: BroadcasterConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout elapses or the source stops
    #[instrument(name = "broadcaster_run", skip_all, fields(topic = %self.config.blueprint.publisher.topic))]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<BroadcastStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
        }

        let host = HostIdentity::resolve().await;
        info!(
            hostname = %host.hostname,
            local_ip = ?host.local_ip,
            "Host identity resolved"
        );

        let settings = blueprint.camera.settings_for_host(&host.hostname);
        info!(
            framerate = settings.framerate,
            width = settings.frame_width,
            height = settings.frame_height,
            rotation = settings.rotation,
            vflip = settings.vflip,
            hflip = settings.hflip,
            "Camera configured"
        );

        let mut camera = SyntheticCamera::new("synthetic", settings);
        if let Some(max) = self.config.max_frames {
            camera = camera.with_max_frames(max);
        }

        // Endpoints are bound before capture starts
        let group =
            SocketGroup::<TcpPubSocket>::bind(&SocketGroupConfig::from(&blueprint.publisher))
                .await?;
        let endpoints = group.local_addrs();
        let probe = group.probe();
        info!(
            topic = %blueprint.publisher.topic,
            endpoints = ?endpoints,
            "Publish endpoints bound"
        );

        let metrics = Arc::new(PublisherMetrics::new());
        let mut builder = FramePublisher::builder(blueprint.publisher.topic.clone(), group)
            .drop_every_nth(blueprint.debug.drop_nth_frame)
            .hostname(host.hostname.clone())
            .metrics(Arc::clone(&metrics));

        if blueprint.camera.annotate_metadata {
            match camera.annotation_target() {
                Some(target) => {
                    builder = builder.annotator(MetadataAnnotator::new(host.hostname.clone(), target));
                }
                None => warn!(source = camera.name(), "Source does not support annotations"),
            }
        }

        if blueprint.debug.drop_nth_frame > 0 {
            warn!(
                drop_nth_frame = blueprint.debug.drop_nth_frame,
                "Debug frame drop enabled"
            );
        }

        camera
            .start(builder.build().into_callback())
            .map_err(CliError::Source)?;
        info!(source = camera.name(), "Capture started");

        let mut throughput = ThroughputAggregator::new();
        let mut window = ReportWindow::new(metrics.snapshot());
        let stop_reason = self
            .wait_for_stop(&camera, &metrics, &probe, &mut window, &mut throughput, shutdown)
            .await;

        info!(reason = ?stop_reason, "Stopping capture...");
        tokio::task::spawn_blocking(move || camera.stop())
            .await
            .map_err(|e| CliError::shutdown(format!("capture thread join failed: {e}")))?;

        let final_snapshot = metrics.snapshot();
        window.close(final_snapshot, probe.subscribers(), &mut throughput);

        let stats = BroadcastStats {
            hostname: host.hostname,
            endpoints,
            stop_reason,
            duration: start_time.elapsed(),
            publisher: final_snapshot,
            lagged_messages: probe.lagged_messages(),
            throughput,
        };

        info!(
            frames_published = stats.publisher.frames_published,
            frames_filtered = stats.publisher.frames_filtered,
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Broadcaster shutdown complete"
        );

        Ok(stats)
    }

    async fn wait_for_stop(
        &self,
        camera: &SyntheticCamera,
        metrics: &PublisherMetrics,
        probe: &SubscriberProbe,
        window: &mut ReportWindow,
        throughput: &mut ThroughputAggregator,
        shutdown: impl Future<Output = ()>,
    ) -> StopReason {
        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        let mut poll = tokio::time::interval(SOURCE_POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal");
                    return StopReason::Signal;
                }
                _ = &mut deadline => {
                    info!(timeout_secs = timeout.unwrap_or_default().as_secs(), "Timeout reached");
                    return StopReason::Timeout;
                }
                _ = poll.tick() => {
                    if window.started.elapsed() >= self.config.report_interval {
                        window.close(metrics.snapshot(), probe.subscribers(), throughput);
                    }
                    if !camera.is_running() {
                        info!(frames = metrics.frames_received(), "Source finished");
                        return StopReason::SourceFinished;
                    }
                }
            }
        }
    }
}

/// Counters at the start of the current report window
struct ReportWindow {
    started: Instant,
    baseline: MetricsSnapshot,
}

impl ReportWindow {
    fn new(baseline: MetricsSnapshot) -> Self {
        Self {
            started: Instant::now(),
            baseline,
        }
    }

    /// Log the window, feed it to the aggregator and start the next one
    fn close(
        &mut self,
        snapshot: MetricsSnapshot,
        subscribers: usize,
        throughput: &mut ThroughputAggregator,
    ) {
        let elapsed = self.started.elapsed();
        let frames = snapshot.frames_published - self.baseline.frames_published;
        let bytes = snapshot.bytes_published - self.baseline.bytes_published;
        let filtered = snapshot.frames_filtered - self.baseline.frames_filtered;

        throughput.push_window(frames, bytes, subscribers, elapsed);

        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            info!(
                frames,
                filtered,
                subscribers,
                fps = format!("{:.2}", frames as f64 / secs),
                last_frame_index = snapshot.last_frame_index,
                "Throughput"
            );
        }

        self.started = Instant::now();
        self.baseline = snapshot;
    }
}
