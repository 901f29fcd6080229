//! Domain registration date lookup.
//!
//! Uses RDAP, the JSON successor of port-43 WHOIS, which reports the same
//! creation date as a `registration` event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::{net::IpAddr, time::Duration};

use crate::probe::{LookupError, RegistrationLookup};

// ── RDAP response shape ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    action: String,
    #[serde(rename = "eventDate")]
    date: Option<String>,
}

// ── Lookup ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct RdapLookup {
    client: Client,
    base_url: String,
}

impl RdapLookup {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("link-analyser/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl RegistrationLookup for RdapLookup {
    async fn created_at(&self, host: &str) -> Result<DateTime<Utc>, LookupError> {
        let domain = registrable_domain(host)?;
        let url = format!("{}/domain/{}", self.base_url, domain);

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/rdap+json")
            .send()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(LookupError::Unavailable(format!(
                "RDAP returned {} for {}",
                resp.status(),
                domain
            )));
        }

        let body: RdapDomain = resp
            .json()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        registration_date(&body.events)
    }
}

/// Reduce a hostname to the domain a registry knows about, e.g.
/// `login.example.co.uk` → `example.co.uk`.
pub(crate) fn registrable_domain(host: &str) -> Result<String, LookupError> {
    let host = host.trim_end_matches('.').to_lowercase();
    if host.is_empty() {
        return Err(LookupError::Unavailable("empty hostname".into()));
    }
    if host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok()
    {
        return Err(LookupError::Unavailable(format!(
            "{host} is an IP address, not a domain"
        )));
    }
    psl::domain_str(&host)
        .map(str::to_owned)
        .ok_or_else(|| LookupError::Unavailable(format!("no registrable domain in {host}")))
}

/// First `registration` event with a parseable date. Only the first such
/// event is considered, the way WHOIS clients take the first creation date.
fn registration_date(events: &[RdapEvent]) -> Result<DateTime<Utc>, LookupError> {
    let event = events
        .iter()
        .find(|e| e.action.eq_ignore_ascii_case("registration"))
        .ok_or(LookupError::NotFound)?;
    let date = event.date.as_deref().ok_or(LookupError::NotFound)?;
    DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LookupError::Unavailable(format!("bad registration date {date:?}: {e}")))
}
