//! Subscriber - reference client for a publish endpoint

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use contracts::WireMessage;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::error::PublisherError;

/// Default upper bound on a single message
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// Connected subscriber filtering on one topic
pub struct Subscriber {
    addr: SocketAddr,
    topic: Bytes,
    reader: BufReader<TcpStream>,
    max_message_len: usize,
}

impl Subscriber {
    /// Connect to a publish endpoint and subscribe to `topic`
    pub async fn connect(addr: SocketAddr, topic: impl Into<Bytes>) -> Result<Self, PublisherError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| PublisherError::connect(addr, e))?;
        debug!(addr = %addr, "subscriber connected");

        Ok(Self {
            addr,
            topic: topic.into(),
            reader: BufReader::new(stream),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        })
    }

    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Next message published under the subscribed topic
    ///
    /// Messages for other topics are skipped. Returns `Ok(None)` once the
    /// publisher closes the connection.
    pub async fn recv(&mut self) -> Result<Option<WireMessage>, PublisherError> {
        loop {
            let len = match self.reader.read_u32().await {
                Ok(len) => len as usize,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            if len > self.max_message_len {
                return Err(PublisherError::MessageTooLarge {
                    len,
                    max: self.max_message_len,
                });
            }

            let mut buf = BytesMut::zeroed(len);
            self.reader.read_exact(&mut buf).await?;
            let message = buf.freeze();

            if !WireMessage::matches_topic(&message, &self.topic) {
                trace!(len, "skipping message for another topic");
                continue;
            }
            return Ok(Some(WireMessage::parse(message, &self.topic)?));
        }
    }
}
