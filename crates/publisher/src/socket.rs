//! PubSocket trait and SocketGroup fan-out

use bytes::Bytes;
use tracing::warn;

use crate::error::PublisherError;

/// Publish-capable socket
///
/// `send` must never block on subscriber readiness: it either queues the
/// message for the connected subscribers or discards it.
pub trait PubSocket: Send {
    /// Endpoint description (used for logging)
    fn endpoint(&self) -> String;

    /// Queue `message` for every connected subscriber
    ///
    /// Returns the number of subscribers it was queued for. Having no
    /// subscribers is not an error.
    fn send(&self, message: &Bytes) -> Result<usize, PublisherError>;
}

/// Outcome of writing one message to every socket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Sockets that accepted the message
    pub sent: usize,
    /// Sockets whose write failed
    pub failed: usize,
    /// Subscribers reached across all sockets
    pub subscribers: usize,
}

/// Fixed, ordered set of N >= 1 sockets receiving identical messages
pub struct SocketGroup<S> {
    sockets: Vec<S>,
}

impl<S: PubSocket> SocketGroup<S> {
    /// Group already-bound sockets, in fan-out order
    ///
    /// # Errors
    /// An empty group is not a valid running state.
    pub fn new(sockets: Vec<S>) -> Result<Self, PublisherError> {
        if sockets.is_empty() {
            return Err(PublisherError::invalid_range(
                "<empty group>",
                "socket group needs at least one endpoint",
            ));
        }
        Ok(Self { sockets })
    }

    /// Number of sockets (the duplication count)
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    /// Always false, kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Sockets in fan-out order
    pub fn sockets(&self) -> &[S] {
        &self.sockets
    }

    /// Write `message` to every socket in order
    ///
    /// A failing socket is logged and skipped; the remaining sockets still
    /// receive the message.
    pub fn broadcast(&self, message: &Bytes) -> FanOutReport {
        let mut report = FanOutReport::default();
        for socket in &self.sockets {
            match socket.send(message) {
                Ok(subscribers) => {
                    report.sent += 1;
                    report.subscribers += subscribers;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(endpoint = %socket.endpoint(), error = %e, "send failed");
                }
            }
        }
        report
    }
}
