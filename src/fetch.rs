use async_trait::async_trait;
use reqwest::{header::LOCATION, redirect::Policy, Client, StatusCode};
use std::{error::Error as StdError, time::Duration};

use crate::probe::{FetchError, FetchedPage, LookupError, PageFetcher};

const USER_AGENT: &str = concat!("link-analyser/", env!("CARGO_PKG_VERSION"));

/// `reqwest`-backed page fetcher.
///
/// Holds two clients: one that never follows redirects (used to walk the
/// chain one hop at a time) and one with the default redirect policy (used
/// only to see whether a full HTTPS fetch trips certificate validation).
#[derive(Clone, Debug)]
pub struct HttpPageFetcher {
    hop_client: Client,
    tls_client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let hop_client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let tls_client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            hop_client,
            tls_client,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let resp = self
            .hop_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError(e.to_string()))?;

        let status = resp.status();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        // Only successful pages are parsed, so skip the body otherwise.
        let body = if status == StatusCode::OK {
            resp.text()
                .await
                .map_err(|e| tracing::debug!("body read failed for {}: {}", url, e))
                .ok()
        } else {
            None
        };

        Ok(FetchedPage {
            status: status.as_u16(),
            location,
            body,
        })
    }

    async fn check_tls(&self, url: &str) -> Result<bool, LookupError> {
        match self.tls_client.get(url).send().await {
            Ok(_) => Ok(true),
            Err(e) if is_tls_error(&e) => {
                tracing::debug!("TLS validation failed for {}: {}", url, e);
                Ok(false)
            }
            Err(e) => Err(LookupError::Unavailable(e.to_string())),
        }
    }
}

/// Walk an error's source chain looking for a rustls failure. reqwest wraps
/// handshake errors in `io::Error`, whose `source()` skips the inner error,
/// so that case is unwrapped by hand.
pub(crate) fn is_tls_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<rustls::Error>().is_some() {
            return true;
        }
        if let Some(inner) = e
            .downcast_ref::<std::io::Error>()
            .and_then(|io| io.get_ref())
        {
            if inner.downcast_ref::<rustls::Error>().is_some() {
                return true;
            }
        }
        let msg = e.to_string().to_lowercase();
        if msg.contains("certificate") || msg.contains("handshake") {
            return true;
        }
        current = e.source();
    }
    false
}
