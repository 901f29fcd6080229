//! Follows a URL's redirect chain one hop at a time, collecting per-hop
//! diagnostics.
//!
//! Every hop is handled strictly in sequence. Only a failure of the hop's own
//! GET ends the walk early; every other lookup degrades to a sentinel
//! (`None`, `-1`, empty) and the walk carries on.

use chrono::{DateTime, Utc};
use url::Url;

use crate::{
    html,
    models::{FailedHop, FetchedHop, HopRecord, UNKNOWN_DOMAIN_AGE},
    probe::{FetchedPage, Probes},
};

/// Redirect statuses whose `Location` header is followed.
const REDIRECT_STATUSES: [u16; 4] = [301, 302, 307, 308];

pub const DEFAULT_MAX_HOPS: usize = 5;

#[derive(Clone)]
pub struct RedirectChainWalker {
    probes: Probes,
    max_hops: usize,
}

impl RedirectChainWalker {
    pub fn new(probes: Probes, max_hops: usize) -> Self {
        Self { probes, max_hops }
    }

    /// Walk the redirect chain starting at `url`.
    ///
    /// The returned chain always has at least one record and at most
    /// `max_hops + 1`.
    pub async fn walk(&self, url: &str) -> Vec<HopRecord> {
        let mut chain = Vec::new();
        let mut current_url = url.to_owned();

        for hop in 0..=self.max_hops {
            let page = match self.probes.fetcher.fetch(&current_url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("hop {} fetch of {} failed: {}", hop, current_url, e);
                    chain.push(HopRecord::Failed(FailedHop {
                        url: current_url,
                        error: e.to_string(),
                    }));
                    break;
                }
            };

            let record = self.inspect_hop(&current_url, &page).await;
            tracing::debug!(
                "hop {}: {} -> {} (ip={:?}, age={})",
                hop,
                record.url,
                record.status_code,
                record.ip,
                record.domain_age_days
            );
            chain.push(HopRecord::Fetched(record));

            match (REDIRECT_STATUSES.contains(&page.status), page.location) {
                (true, Some(location)) => {
                    current_url = resolve_location(&current_url, &location);
                }
                _ => break,
            }
        }

        chain
    }

    /// Gather the soft diagnostics for a hop whose GET succeeded.
    async fn inspect_hop(&self, url: &str, page: &FetchedPage) -> FetchedHop {
        let parsed = Url::parse(url).ok();
        let host = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or_default()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_owned();
        let is_https = parsed.as_ref().is_some_and(|u| u.scheme() == "https");

        let ip = match self.probes.resolver.resolve(&host).await {
            Ok(ip) => Some(ip.to_string()),
            Err(e) => {
                tracing::debug!("resolve {:?}: {}", host, e);
                None
            }
        };

        let (tls_valid, cert_issuer) = if is_https {
            let tls_valid = self
                .probes
                .fetcher
                .check_tls(url)
                .await
                .map_err(|e| tracing::debug!("TLS check for {}: {}", url, e))
                .ok();
            let issuer = self
                .probes
                .certs
                .issuer_cn(&host)
                .await
                .map_err(|e| tracing::debug!("certificate issuer for {}: {}", host, e))
                .ok();
            (tls_valid, issuer)
        } else {
            (None, None)
        };

        let domain_age_days = match self.probes.registry.created_at(&host).await {
            Ok(created) => age_in_days(Utc::now(), created),
            Err(e) => {
                tracing::debug!("registration date for {:?}: {}", host, e);
                UNKNOWN_DOMAIN_AGE
            }
        };

        let (title, form_actions) = match (&page.body, page.status) {
            (Some(body), 200) => html::summarize_page(body),
            _ => (String::new(), Vec::new()),
        };

        FetchedHop {
            url: url.to_owned(),
            status_code: page.status,
            ip,
            tls_valid,
            cert_issuer,
            domain_age_days,
            title,
            form_actions,
        }
    }
}

/// Resolve a `Location` header against the URL that returned it.
///
/// A location with a scheme is taken verbatim. Anything else replaces the
/// path of `current`; a query or fragment inside the location replaces the
/// current one, otherwise the current one is kept.
pub fn resolve_location(current: &str, location: &str) -> String {
    if has_scheme(location) {
        return location.to_owned();
    }
    let Ok(mut next) = Url::parse(current) else {
        return location.to_owned();
    };

    let (rest, fragment) = match location.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (location, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    next.set_path(path);
    if query.is_some() {
        next.set_query(query);
    }
    if fragment.is_some() {
        next.set_fragment(fragment);
    }
    next.to_string()
}

/// Whole days since `created`, rounded down, so a registration stamped
/// later than `now` is negative.
fn age_in_days(now: DateTime<Utc>, created: DateTime<Utc>) -> i64 {
    (now - created).num_seconds().div_euclid(86_400)
}

/// `true` when `location` opens with `ALPHA *(ALPHA / DIGIT / "+" / "-" / ".") ":"`.
/// Purely syntactic: the rest of the location need not parse.
fn has_scheme(location: &str) -> bool {
    let Some((scheme, _)) = location.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
