//! Host identity shown in logs and stamped into frames.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::debug;

const HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

/// Name and primary address of this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub hostname: String,
    pub local_ip: Option<IpAddr>,
}

impl HostIdentity {
    /// Resolve hostname and the address used for outbound traffic
    pub async fn resolve() -> Self {
        Self {
            hostname: hostname(),
            local_ip: local_ip().await,
        }
    }
}

/// Kernel hostname, then `$HOSTNAME`, then `"localhost"`
fn hostname() -> String {
    std::fs::read_to_string(HOSTNAME_PATH)
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|name| !name.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}

/// Source address the kernel picks for a public destination
///
/// Connecting a UDP socket sends nothing; it only selects a route.
async fn local_ip() -> Option<IpAddr> {
    let probe = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 53);
    let result = async {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.connect(probe).await?;
        socket.local_addr()
    }
    .await;

    match result {
        Ok(addr) => Some(addr.ip()),
        Err(e) => {
            debug!(error = %e, "no route to determine local address");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_is_never_empty() {
        assert!(!hostname().is_empty());
    }

    #[tokio::test]
    async fn test_resolve() {
        let identity = HostIdentity::resolve().await;
        assert_eq!(identity.hostname, hostname());
        if let Some(ip) = identity.local_ip {
            assert!(!ip.is_unspecified());
        }
    }
}
