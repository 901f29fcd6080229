//! Seams for every external lookup made while walking a redirect chain.
//!
//! Each probe is a trait so the walker can be driven by fakes in tests; the
//! production implementations live in `fetch`, `dns`, `tls` and `whois`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{net::IpAddr, sync::Arc};

use crate::{config::AppConfig, dns, fetch, tls, whois};

/// Outcome of a soft lookup that did not yield a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The lookup could not be completed (network failure, timeout, bad input).
    #[error("lookup unavailable: {0}")]
    Unavailable(String),
    /// The lookup completed but the requested datum does not exist.
    #[error("not found")]
    NotFound,
}

/// Terminal failure of a hop's primary GET.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Response to a single non-redirect-following GET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    /// Raw `Location` header, if any.
    pub location: Option<String>,
    /// Body text; only read for status 200.
    pub body: Option<String>,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` without following redirects.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;

    /// GET `url` following redirects, only to learn whether TLS validation
    /// passes. `Ok(false)` means a TLS or certificate error occurred.
    async fn check_tls(&self, url: &str) -> Result<bool, LookupError>;
}

#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<IpAddr, LookupError>;
}

#[async_trait]
pub trait CertInspector: Send + Sync {
    /// Common name of the issuer of the certificate served on `host:443`.
    async fn issuer_cn(&self, host: &str) -> Result<String, LookupError>;
}

#[async_trait]
pub trait RegistrationLookup: Send + Sync {
    /// Registration (creation) date of the domain `host` belongs to.
    async fn created_at(&self, host: &str) -> Result<DateTime<Utc>, LookupError>;
}

/// The full set of probes a walker uses.
#[derive(Clone)]
pub struct Probes {
    pub fetcher: Arc<dyn PageFetcher>,
    pub resolver: Arc<dyn HostResolver>,
    pub certs: Arc<dyn CertInspector>,
    pub registry: Arc<dyn RegistrationLookup>,
}

impl Probes {
    /// Build the network-backed probes from configuration.
    pub fn live(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: Arc::new(fetch::HttpPageFetcher::new(config.probe_timeout)?),
            resolver: Arc::new(dns::SystemResolver::new(config.dns_timeout)),
            certs: Arc::new(tls::RustlsCertInspector::new(config.probe_timeout)?),
            registry: Arc::new(whois::RdapLookup::new(
                &config.rdap_base_url,
                config.whois_timeout,
            )?),
        })
    }
}
