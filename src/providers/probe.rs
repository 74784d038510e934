//! Pre-flight reachability check run before each tier's fetch.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::debug;
use url::Url;

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Whether the host behind `url` resolves and accepts a TCP connection.
    async fn is_reachable(&self, url: &str) -> bool;
}

/// DNS lookup followed by a short TCP connect to the URL's port (443 for https).
pub struct TcpProbe {
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            debug!(url, "Probe: unparsable URL");
            return false;
        };
        let (Some(host), Some(port)) = (parsed.host_str(), parsed.port_or_known_default()) else {
            debug!(url, "Probe: URL has no host or port");
            return false;
        };
        // IPv6 literals come back bracketed from host_str
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let addrs: Vec<_> = match timeout(self.connect_timeout, lookup_host((host, port))).await {
            Ok(Ok(addrs)) => addrs.collect(),
            Ok(Err(e)) => {
                debug!(host, error = %e, "Probe: DNS lookup failed");
                return false;
            }
            Err(_) => {
                debug!(host, "Probe: DNS lookup timed out");
                return false;
            }
        };

        for addr in addrs {
            match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(_stream)) => {
                    debug!(host, %addr, "Probe: reachable");
                    return true;
                }
                Ok(Err(e)) => debug!(host, %addr, error = %e, "Probe: connect failed"),
                Err(_) => debug!(host, %addr, "Probe: connect timed out"),
            }
        }
        false
    }
}
