use async_trait::async_trait;
use std::{net::IpAddr, time::Duration};
use tokio::net::lookup_host;

use crate::probe::{HostResolver, LookupError};

/// Resolves hostnames through the operating system resolver.
#[derive(Clone, Debug)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, LookupError> {
        if host.is_empty() {
            return Err(LookupError::Unavailable("empty hostname".into()));
        }
        // IPv6 literals arrive bracketed from `Url::host_str`.
        let host = host.trim_start_matches('[').trim_end_matches(']');

        // The port is irrelevant but required by `lookup_host`.
        let addrs = tokio::time::timeout(self.timeout, lookup_host((host, 0)))
            .await
            .map_err(|_| LookupError::Unavailable(format!("resolution of {host} timed out")))?
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        // Prefer IPv4 like a classic gethostbyname would.
        let all: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
        all.iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| all.first())
            .copied()
            .ok_or(LookupError::NotFound)
    }
}
