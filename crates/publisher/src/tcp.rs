//! TcpPubSocket - TCP publish endpoint
//!
//! Each message is framed on the stream as `[u32 BE length][message]`.
//! Sends go through a bounded broadcast queue so the capture thread never
//! waits on a subscriber; one writer task per subscriber drains it.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use contracts::PublisherConfig;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::PublisherError;
use crate::socket::{PubSocket, SocketGroup};

/// Largest message the length prefix can describe
pub const MAX_MESSAGE_LEN: usize = u32::MAX as usize;

/// Addressing for a group of TCP endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketGroupConfig {
    pub bind_host: IpAddr,
    pub base_port: u16,
    pub duplication: usize,
    /// Messages buffered per subscriber before it starts losing the oldest
    pub queue_capacity: usize,
}

impl SocketGroupConfig {
    /// Endpoint addresses `host:base_port+i` for `i` in `0..duplication`
    ///
    /// # Errors
    /// Fails if the group is empty or runs past port 65535.
    pub fn addrs(&self) -> Result<Vec<SocketAddr>, PublisherError> {
        if self.duplication == 0 {
            return Err(PublisherError::invalid_range(
                SocketAddr::new(self.bind_host, self.base_port),
                "duplication must be at least 1",
            ));
        }
        (0..self.duplication)
            .map(|i| {
                u16::try_from(i)
                    .ok()
                    .and_then(|offset| self.base_port.checked_add(offset))
                    .map(|port| SocketAddr::new(self.bind_host, port))
                    .ok_or_else(|| {
                        PublisherError::invalid_range(
                            format!("{}:{}+{}", self.bind_host, self.base_port, i),
                            "endpoint port exceeds 65535",
                        )
                    })
            })
            .collect()
    }
}

impl From<&PublisherConfig> for SocketGroupConfig {
    fn from(config: &PublisherConfig) -> Self {
        Self {
            bind_host: config.bind_host,
            base_port: config.base_port,
            duplication: config.duplication,
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Shared per-endpoint counters, updated by the accept and writer tasks
#[derive(Debug, Default)]
struct EndpointCounters {
    subscribers: AtomicUsize,
    lagged: AtomicU64,
}

/// One bound publish endpoint
pub struct TcpPubSocket {
    local_addr: SocketAddr,
    tx: broadcast::Sender<Bytes>,
    counters: Arc<EndpointCounters>,
    accept_task: JoinHandle<()>,
}

impl TcpPubSocket {
    /// Bind `addr` and start accepting subscribers
    ///
    /// Must be called inside a tokio runtime.
    pub async fn bind(addr: SocketAddr, queue_capacity: usize) -> Result<Self, PublisherError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PublisherError::bind(addr, e))?;
        Self::serve(listener, queue_capacity)
    }

    /// Start accepting subscribers on an already-bound listener
    pub fn serve(listener: TcpListener, queue_capacity: usize) -> Result<Self, PublisherError> {
        let local_addr = listener.local_addr()?;
        if queue_capacity == 0 {
            return Err(PublisherError::invalid_range(
                local_addr,
                "queue capacity must be at least 1",
            ));
        }

        let (tx, _) = broadcast::channel(queue_capacity);
        let counters = Arc::new(EndpointCounters::default());
        let accept_task = tokio::spawn(accept_loop(
            listener,
            local_addr,
            tx.clone(),
            Arc::clone(&counters),
        ));

        info!(endpoint = %local_addr, queue_capacity, "publish endpoint listening");

        Ok(Self {
            local_addr,
            tx,
            counters,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Currently connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.counters.subscribers.load(Ordering::Relaxed)
    }

    /// Messages skipped by subscribers that fell behind
    pub fn lagged_messages(&self) -> u64 {
        self.counters.lagged.load(Ordering::Relaxed)
    }
}

impl PubSocket for TcpPubSocket {
    fn endpoint(&self) -> String {
        format!("tcp://{}", self.local_addr)
    }

    fn send(&self, message: &Bytes) -> Result<usize, PublisherError> {
        check_frame_len(&self.endpoint(), message.len(), MAX_MESSAGE_LEN)?;
        // Err only means nobody is subscribed; the message is discarded.
        Ok(self.tx.send(message.clone()).unwrap_or(0))
    }
}

impl Drop for TcpPubSocket {
    fn drop(&mut self) {
        self.accept_task.abort();
        debug!(endpoint = %self.local_addr, "publish endpoint closed");
    }
}

impl SocketGroup<TcpPubSocket> {
    /// Bind every endpoint of the group
    ///
    /// All listeners are bound before any of them starts serving. If one
    /// bind fails the listeners bound so far are released and the error is
    /// returned, leaving no endpoint open.
    #[instrument(
        name = "socket_group_bind",
        skip_all,
        fields(base_port = config.base_port, duplication = config.duplication)
    )]
    pub async fn bind(config: &SocketGroupConfig) -> Result<Self, PublisherError> {
        let addrs = config.addrs()?;

        let mut listeners = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|e| PublisherError::bind(addr, e))?;
            listeners.push(listener);
        }

        let sockets = listeners
            .into_iter()
            .map(|listener| TcpPubSocket::serve(listener, config.queue_capacity))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(sockets)
    }

    /// Subscribers across all endpoints
    pub fn subscriber_count(&self) -> usize {
        self.sockets().iter().map(TcpPubSocket::subscriber_count).sum()
    }

    /// Bound addresses in fan-out order
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.sockets().iter().map(TcpPubSocket::local_addr).collect()
    }

    /// Read-only view of the group's counters that outlives a move of the group
    pub fn probe(&self) -> SubscriberProbe {
        SubscriberProbe {
            counters: self
                .sockets()
                .iter()
                .map(|s| Arc::clone(&s.counters))
                .collect(),
        }
    }
}

/// Subscriber and lag counters of a socket group
///
/// Stays readable after the group moved into a frame callback.
#[derive(Debug, Clone)]
pub struct SubscriberProbe {
    counters: Vec<Arc<EndpointCounters>>,
}

impl SubscriberProbe {
    /// Connected subscribers across all endpoints
    pub fn subscribers(&self) -> usize {
        self.counters
            .iter()
            .map(|c| c.subscribers.load(Ordering::Relaxed))
            .sum()
    }

    /// Messages skipped by slow subscribers across all endpoints
    pub fn lagged_messages(&self) -> u64 {
        self.counters
            .iter()
            .map(|c| c.lagged.load(Ordering::Relaxed))
            .sum()
    }
}

async fn accept_loop(
    listener: TcpListener,
    endpoint: SocketAddr,
    tx: broadcast::Sender<Bytes>,
    counters: Arc<EndpointCounters>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                // Subscribe before spawning so the first message after accept is not missed
                let rx = tx.subscribe();
                counters.subscribers.fetch_add(1, Ordering::Relaxed);
                info!(endpoint = %endpoint, peer = %peer, "subscriber connected");
                observability::record_subscriber_connected();
                tokio::spawn(write_loop(stream, endpoint, peer, rx, Arc::clone(&counters)));
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "accept failed");
            }
        }
    }
}

async fn write_loop(
    stream: TcpStream,
    endpoint: SocketAddr,
    peer: SocketAddr,
    mut rx: broadcast::Receiver<Bytes>,
    counters: Arc<EndpointCounters>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(peer = %peer, error = %e, "set_nodelay failed");
    }
    let mut writer = BufWriter::new(stream);

    loop {
        match rx.recv().await {
            Ok(message) => {
                if let Err(e) = write_framed(&mut writer, &message, rx.is_empty()).await {
                    debug!(endpoint = %endpoint, peer = %peer, error = %e, "subscriber write failed");
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                counters.lagged.fetch_add(skipped, Ordering::Relaxed);
                observability::record_subscriber_lag(skipped);
                warn!(endpoint = %endpoint, peer = %peer, skipped, "slow subscriber skipped messages");
            }
            Err(RecvError::Closed) => {
                if let Err(e) = writer.shutdown().await {
                    debug!(peer = %peer, error = %e, "shutdown failed");
                }
                break;
            }
        }
    }

    counters.subscribers.fetch_sub(1, Ordering::Relaxed);
    observability::record_subscriber_disconnected();
    info!(endpoint = %endpoint, peer = %peer, "subscriber disconnected");
}

/// Reject messages the length prefix cannot describe
fn check_frame_len(endpoint: &str, len: usize, max: usize) -> Result<(), PublisherError> {
    if len > max {
        return Err(PublisherError::send(
            endpoint,
            format!("message of {len} bytes exceeds frame limit of {max} bytes"),
        ));
    }
    Ok(())
}

async fn write_framed(
    writer: &mut BufWriter<TcpStream>,
    message: &[u8],
    flush: bool,
) -> std::io::Result<()> {
    // send() rejects anything longer than MAX_MESSAGE_LEN
    writer.write_u32(message.len() as u32).await?;
    writer.write_all(message).await?;
    if flush {
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    async fn wait_for_subscribers(socket: &TcpPubSocket, n: usize) {
        for _ in 0..200 {
            if socket.subscriber_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscriber never registered");
    }

    async fn read_framed(stream: &mut TcpStream) -> Vec<u8> {
        let len = stream.read_u32().await.unwrap() as usize;
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[test]
    fn test_addrs_are_consecutive() {
        let config = SocketGroupConfig {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: 5555,
            duplication: 3,
            queue_capacity: 8,
        };
        let ports: Vec<u16> = config.addrs().unwrap().iter().map(|a| a.port()).collect();
        assert_eq!(ports, vec![5555, 5556, 5557]);
    }

    #[test]
    fn test_addrs_past_port_range_rejected() {
        let config = SocketGroupConfig {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: 65535,
            duplication: 2,
            queue_capacity: 8,
        };
        let err = config.addrs().unwrap_err();
        assert!(err.is_bind());
        assert!(err.to_string().contains("65535"), "got: {err}");
    }

    #[test]
    fn test_zero_duplication_rejected() {
        let config = SocketGroupConfig {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: 5555,
            duplication: 0,
            queue_capacity: 8,
        };
        assert!(config.addrs().is_err());
    }

    #[test]
    fn test_oversized_frame_is_a_send_error() {
        assert!(check_frame_len("tcp://127.0.0.1:5555", 8, 8).is_ok());

        let err = check_frame_len("tcp://127.0.0.1:5555", 9, 8).unwrap_err();
        assert!(matches!(err, PublisherError::Send { .. }));
        assert!(err.to_string().contains("tcp://127.0.0.1:5555"), "got: {err}");
    }

    #[tokio::test]
    async fn test_send_without_subscribers_is_discarded() {
        let socket = TcpPubSocket::bind(localhost(0), 4).await.unwrap();
        let sent = socket.send(&Bytes::from_static(b"nobody")).unwrap();
        assert_eq!(sent, 0);
        assert_eq!(socket.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_framed_message() {
        let socket = TcpPubSocket::bind(localhost(0), 4).await.unwrap();
        let mut client = TcpStream::connect(socket.local_addr()).await.unwrap();
        wait_for_subscribers(&socket, 1).await;

        let sent = socket.send(&Bytes::from_static(b"cam1hello")).unwrap();
        assert_eq!(sent, 1);

        let received = tokio::time::timeout(Duration::from_secs(5), read_framed(&mut client))
            .await
            .unwrap();
        assert_eq!(received, b"cam1hello");
    }

    #[tokio::test]
    async fn test_zero_queue_capacity_rejected() {
        let listener = TcpListener::bind(localhost(0)).await.unwrap();
        let result = TcpPubSocket::serve(listener, 0);
        assert!(matches!(result, Err(PublisherError::Bind { .. })));
    }

    /// Port `p` with `p + 1` held by the returned listener
    async fn port_with_busy_neighbour() -> (u16, TcpListener) {
        loop {
            let probe = TcpListener::bind(localhost(0)).await.unwrap();
            let port = probe.local_addr().unwrap().port();
            if port == u16::MAX {
                continue;
            }
            if let Ok(blocker) = TcpListener::bind(localhost(port + 1)).await {
                return (port, blocker);
            }
        }
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_oldest() {
        let socket = TcpPubSocket::bind(localhost(0), 2).await.unwrap();
        let mut client = TcpStream::connect(socket.local_addr()).await.unwrap();
        wait_for_subscribers(&socket, 1).await;

        // The writer task cannot run between these sends on a current-thread runtime
        for i in 0u8..10 {
            socket.send(&Bytes::from(vec![i])).unwrap();
        }

        let first = tokio::time::timeout(Duration::from_secs(5), read_framed(&mut client))
            .await
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(5), read_framed(&mut client))
            .await
            .unwrap();
        assert_eq!(first, vec![8]);
        assert_eq!(second, vec![9]);
        assert_eq!(socket.lagged_messages(), 8);
    }

    #[tokio::test]
    async fn test_group_bind_failure_leaves_nothing_bound() {
        let (base, blocker) = port_with_busy_neighbour().await;
        let config = SocketGroupConfig {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: base,
            duplication: 2,
            queue_capacity: 4,
        };

        let err = match SocketGroup::<TcpPubSocket>::bind(&config).await {
            Ok(_) => panic!("bind should fail while {} is taken", base + 1),
            Err(e) => e,
        };
        assert!(err.is_bind());
        assert!(err.to_string().contains(&(base + 1).to_string()), "got: {err}");

        // The first endpoint was released with the failed group
        TcpListener::bind(localhost(base)).await.unwrap();
        drop(blocker);
    }

    #[tokio::test]
    async fn test_probe_tracks_subscribers() {
        let socket = TcpPubSocket::bind(localhost(0), 4).await.unwrap();
        let addr = socket.local_addr();
        let group = SocketGroup::new(vec![socket]).unwrap();
        let probe = group.probe();

        let _client = TcpStream::connect(addr).await.unwrap();
        for _ in 0..200 {
            if probe.subscribers() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(probe.subscribers(), 1);
        assert_eq!(group.subscriber_count(), 1);
        assert_eq!(probe.lagged_messages(), 0);
    }

    #[tokio::test]
    async fn test_endpoint_format() {
        let socket = TcpPubSocket::bind(localhost(0), 1).await.unwrap();
        let endpoint = socket.endpoint();
        assert!(endpoint.starts_with("tcp://127.0.0.1:"), "got: {endpoint}");
    }
}
