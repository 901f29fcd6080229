//! Raw TLS handshake used to read the issuer of a host's leaf certificate.

use async_trait::async_trait;
use rustls::{pki_types::ServerName, ClientConfig, RootCertStore};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::probe::{CertInspector, LookupError};

#[derive(Clone)]
pub struct RustlsCertInspector {
    config: Arc<ClientConfig>,
    timeout: Duration,
}

impl RustlsCertInspector {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        // Pin the ring provider; reqwest pulls in rustls too, so the process
        // default provider cannot be relied upon.
        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        Ok(Self {
            config: Arc::new(config),
            timeout,
        })
    }
}

#[async_trait]
impl CertInspector for RustlsCertInspector {
    async fn issuer_cn(&self, host: &str) -> Result<String, LookupError> {
        let server_name = ServerName::try_from(host.to_owned())
            .map_err(|e| LookupError::Unavailable(format!("invalid server name {host}: {e}")))?;

        let sock = tokio::time::timeout(self.timeout, TcpStream::connect((host, 443)))
            .await
            .map_err(|_| LookupError::Unavailable(format!("connect to {host}:443 timed out")))?
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        let connector = TlsConnector::from(self.config.clone());
        let stream = tokio::time::timeout(self.timeout, connector.connect(server_name, sock))
            .await
            .map_err(|_| LookupError::Unavailable(format!("TLS handshake with {host} timed out")))?
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        let leaf = stream
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or(LookupError::NotFound)?;

        issuer_common_name(leaf.as_ref())
    }
}

/// Extract the issuer CN from a DER-encoded certificate.
pub(crate) fn issuer_common_name(der: &[u8]) -> Result<String, LookupError> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| LookupError::Unavailable(format!("certificate parse failed: {e}")))?;

    let cn = cert
        .issuer()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_owned);
    cn.ok_or(LookupError::NotFound)
}
