//! FramePublisher - per-frame callback that fans frames out to subscribers

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use contracts::{Frame, FrameCallback, WireMessage};
use tracing::{debug, trace};

use crate::annotate::Annotator;
use crate::filter::{drop_every_nth, FrameFilter, KeepAll};
use crate::metrics::PublisherMetrics;
use crate::socket::{FanOutReport, PubSocket, SocketGroup};
use crate::tcp::TcpPubSocket;

/// What happened to one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Withheld by the drop filter, no socket saw it
    Filtered,
    /// Written to the socket group
    Published(FanOutReport),
}

/// Turns delivered frames into wire messages on every socket of a group
///
/// Owned by exactly one caller (the capture callback). Dropping it closes
/// the sockets.
pub struct FramePublisher<S = TcpPubSocket> {
    topic: Bytes,
    sockets: SocketGroup<S>,
    filter: Box<dyn FrameFilter>,
    annotator: Option<Box<dyn Annotator>>,
    hostname: String,
    last_write: Option<Instant>,
    metrics: Arc<PublisherMetrics>,
}

impl<S: PubSocket> FramePublisher<S> {
    /// Publisher that sends every frame under `topic`
    pub fn new(topic: impl Into<Bytes>, sockets: SocketGroup<S>) -> Self {
        Self::builder(topic, sockets).build()
    }

    pub fn builder(topic: impl Into<Bytes>, sockets: SocketGroup<S>) -> FramePublisherBuilder<S> {
        FramePublisherBuilder {
            topic: topic.into(),
            sockets,
            filter: Box::new(KeepAll),
            annotator: None,
            hostname: String::new(),
            metrics: None,
        }
    }

    pub fn topic(&self) -> &[u8] {
        &self.topic
    }

    pub fn sockets(&self) -> &SocketGroup<S> {
        &self.sockets
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Time of the most recent `on_frame` call, filtered frames included
    pub fn last_write(&self) -> Option<Instant> {
        self.last_write
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<PublisherMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Handle one frame from the capture device
    ///
    /// The annotator runs for every frame, dropped or not, so the overlay
    /// keeps advancing. A filtered frame produces no write on any socket.
    /// Send failures are logged per socket and never propagate.
    pub fn on_frame(&mut self, frame: Frame<'_>) -> FrameOutcome {
        self.metrics.record_received(frame.index);
        observability::record_frame_received();

        let now = Instant::now();
        if let Some(prev) = self.last_write.replace(now) {
            observability::record_frame_interval(now.duration_since(prev));
        }

        if let Some(annotator) = self.annotator.as_mut() {
            annotator.annotate(frame.index);
        }

        if self.filter.should_drop(frame.index) {
            debug!(host = %self.hostname, frame_index = frame.index, "intended frame drop");
            self.metrics.inc_filtered();
            observability::record_frame_filtered();
            return FrameOutcome::Filtered;
        }

        let message = WireMessage::encode(&self.topic, frame.index, frame.payload);
        let report = self.sockets.broadcast(&message);

        self.metrics
            .record_fan_out(message.len(), report.sent, report.failed);
        observability::record_frame_published(message.len(), report.subscribers);
        if report.failed > 0 {
            observability::record_send_failures(report.failed);
        }

        trace!(
            frame_index = frame.index,
            bytes = message.len(),
            subscribers = report.subscribers,
            "frame published"
        );

        FrameOutcome::Published(report)
    }
}

impl<S: PubSocket + 'static> FramePublisher<S> {
    /// Move the publisher into a frame callback
    ///
    /// The sockets live as long as the callback, so they close once the
    /// frame source has released it.
    pub fn into_callback(mut self) -> FrameCallback {
        Box::new(move |frame: Frame<'_>| {
            self.on_frame(frame);
        })
    }
}

/// Builder for [`FramePublisher`]
pub struct FramePublisherBuilder<S> {
    topic: Bytes,
    sockets: SocketGroup<S>,
    filter: Box<dyn FrameFilter>,
    annotator: Option<Box<dyn Annotator>>,
    hostname: String,
    metrics: Option<Arc<PublisherMetrics>>,
}

impl<S: PubSocket> FramePublisherBuilder<S> {
    /// Drop frames whose index is a multiple of `n` (0 publishes everything)
    pub fn drop_every_nth(mut self, n: u64) -> Self {
        self.filter = drop_every_nth(n);
        self
    }

    pub fn filter(mut self, filter: impl FrameFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn annotator(mut self, annotator: impl Annotator + 'static) -> Self {
        self.annotator = Some(Box::new(annotator));
        self
    }

    /// Host name used in log fields
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Share an existing metrics handle
    pub fn metrics(mut self, metrics: Arc<PublisherMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> FramePublisher<S> {
        FramePublisher {
            topic: self.topic,
            sockets: self.sockets,
            filter: self.filter,
            annotator: self.annotator,
            hostname: self.hostname,
            last_write: None,
            metrics: self.metrics.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::testing::RecordingSocket;
    use std::sync::Mutex;

    fn group(sockets: &[RecordingSocket]) -> SocketGroup<RecordingSocket> {
        SocketGroup::new(sockets.to_vec()).unwrap()
    }

    fn indices(socket: &RecordingSocket, topic: &[u8]) -> Vec<u64> {
        socket
            .messages()
            .into_iter()
            .map(|m| WireMessage::parse(m, topic).unwrap().frame_index)
            .collect()
    }

    #[derive(Clone, Default)]
    struct RecordingAnnotator {
        seen: Arc<Mutex<Vec<u64>>>,
    }

    impl Annotator for RecordingAnnotator {
        fn annotate(&mut self, frame_index: u64) {
            self.seen.lock().unwrap().push(frame_index);
        }
    }

    #[test]
    fn test_publishes_exact_wire_bytes() {
        let socket = RecordingSocket::named("s0");
        let mut publisher = FramePublisher::new("cam1", group(&[socket.clone()]));

        let outcome = publisher.on_frame(Frame::new(42, &[0x01, 0x02]));

        assert!(matches!(outcome, FrameOutcome::Published(r) if r.sent == 1));
        let expected: &[u8] = &[
            b'c', b'a', b'm', b'1', 0x2A, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x02,
        ];
        assert_eq!(socket.messages(), vec![Bytes::copy_from_slice(expected)]);
    }

    #[test]
    fn test_drop_every_third_frame() {
        let socket = RecordingSocket::named("s0");
        let mut publisher = FramePublisher::builder("cam1", group(&[socket.clone()]))
            .drop_every_nth(3)
            .build();

        for index in 0..=6 {
            publisher.on_frame(Frame::new(index, b"jpeg"));
        }

        assert_eq!(indices(&socket, b"cam1"), vec![1, 2, 4, 5]);
        let snap = publisher.metrics().snapshot();
        assert_eq!(snap.frames_received, 7);
        assert_eq!(snap.frames_filtered, 3);
        assert_eq!(snap.frames_published, 4);
    }

    #[test]
    fn test_zero_divisor_publishes_everything() {
        let socket = RecordingSocket::named("s0");
        let mut publisher = FramePublisher::builder("t", group(&[socket.clone()]))
            .drop_every_nth(0)
            .build();

        for index in 0..10 {
            publisher.on_frame(Frame::new(index, b"x"));
        }

        assert_eq!(indices(&socket, b"t"), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_every_socket_gets_identical_sequence() {
        let sockets = [
            RecordingSocket::named("s0"),
            RecordingSocket::named("s1"),
            RecordingSocket::named("s2"),
        ];
        let mut publisher = FramePublisher::builder("cam", group(&sockets))
            .drop_every_nth(4)
            .build();

        for index in 0..20 {
            publisher.on_frame(Frame::new(index, &index.to_be_bytes()));
        }

        let first = sockets[0].messages();
        assert_eq!(first.len(), 15);
        for socket in &sockets[1..] {
            assert_eq!(socket.messages(), first);
        }
    }

    #[test]
    fn test_failing_socket_does_not_affect_others() {
        let healthy = RecordingSocket::named("healthy");
        let broken = RecordingSocket::failing("broken");
        let mut publisher =
            FramePublisher::new("cam", SocketGroup::new(vec![broken, healthy.clone()]).unwrap());

        for index in 0..3 {
            let outcome = publisher.on_frame(Frame::new(index, b"p"));
            assert!(matches!(
                outcome,
                FrameOutcome::Published(FanOutReport { sent: 1, failed: 1, .. })
            ));
        }

        assert_eq!(indices(&healthy, b"cam"), vec![0, 1, 2]);
        assert_eq!(publisher.metrics().send_failures(), 3);
    }

    #[test]
    fn test_preserves_delivery_order() {
        let socket = RecordingSocket::named("s0");
        let mut publisher = FramePublisher::new("t", group(&[socket.clone()]));

        let order = [7u64, 3, 100, 4, 5];
        for index in order {
            publisher.on_frame(Frame::new(index, b""));
        }

        assert_eq!(indices(&socket, b"t"), order.to_vec());
    }

    #[test]
    fn test_empty_payload_is_header_only() {
        let socket = RecordingSocket::named("s0");
        let mut publisher = FramePublisher::new("cam1", group(&[socket.clone()]));

        publisher.on_frame(Frame::new(1, &[]));

        let messages = socket.messages();
        assert_eq!(messages[0].len(), 4 + 8);
        let parsed = WireMessage::parse(messages[0].clone(), b"cam1").unwrap();
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_annotates_dropped_frames_too() {
        let annotator = RecordingAnnotator::default();
        let socket = RecordingSocket::named("s0");
        let mut publisher = FramePublisher::builder("t", group(&[socket.clone()]))
            .drop_every_nth(3)
            .annotator(annotator.clone())
            .build();

        for index in 0..=6 {
            publisher.on_frame(Frame::new(index, b"x"));
        }

        assert_eq!(*annotator.seen.lock().unwrap(), (0..=6).collect::<Vec<_>>());
        assert_eq!(socket.messages().len(), 4);
    }

    #[test]
    fn test_into_callback_publishes() {
        let socket = RecordingSocket::named("s0");
        let metrics = Arc::new(PublisherMetrics::new());
        let publisher = FramePublisher::builder("t", group(&[socket.clone()]))
            .metrics(Arc::clone(&metrics))
            .build();

        let mut callback = publisher.into_callback();
        callback(Frame::new(9, b"abc"));
        callback(Frame::new(10, b"def"));
        drop(callback);

        assert_eq!(indices(&socket, b"t"), vec![9, 10]);
        assert_eq!(metrics.frames_published(), 2);
    }

    #[test]
    fn test_last_write_advances_on_filtered_frames() {
        let socket = RecordingSocket::named("s0");
        let mut publisher = FramePublisher::builder("t", group(&[socket.clone()]))
            .drop_every_nth(2)
            .hostname("pi-eye-01")
            .build();

        publisher.on_frame(Frame::new(1, b"x"));
        let published_at = publisher.last_write().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert_eq!(publisher.on_frame(Frame::new(2, b"y")), FrameOutcome::Filtered);
        assert!(publisher.last_write().unwrap() > published_at);
        assert_eq!(indices(&socket, b"t"), vec![1]);
        assert_eq!(publisher.hostname(), "pi-eye-01");
    }
}
