//! Publisher error types

use std::net::SocketAddr;

use thiserror::Error;

/// Publisher-specific errors
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Endpoint could not be bound (fatal at construction)
    #[error("failed to bind publish endpoint {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A single socket write failed (non-fatal, fan-out continues)
    ///
    /// Returned by `PubSocket::send` implementations, e.g. for a message
    /// too large for the TCP frame prefix.
    #[error("send on '{endpoint}' failed: {message}")]
    Send { endpoint: String, message: String },

    /// Subscriber could not reach an endpoint
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Incoming message exceeds the subscriber's read limit
    #[error("message of {len} bytes exceeds limit of {max} bytes")]
    MessageTooLarge { len: usize, max: usize },

    /// Wire format error (from contract)
    #[error("wire error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublisherError {
    /// Create a bind error for `addr`
    pub fn bind(addr: impl ToString, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }

    /// Create a bind error for an endpoint range that cannot exist
    pub fn invalid_range(addr: impl ToString, message: impl Into<String>) -> Self {
        Self::bind(
            addr,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, message.into()),
        )
    }

    /// Create a send error
    pub fn send(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Send {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a connect error
    pub fn connect(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Connect {
            addr: addr.to_string(),
            source,
        }
    }

    /// Whether this error is fatal at construction time
    pub fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}
