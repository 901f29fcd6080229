use anyhow::{Context, Result};
use std::time::Duration;

/// Key material used to verify caller bearer tokens.
#[derive(Debug, Clone)]
pub enum JwtKey {
    /// HS256 shared secret
    Secret(String),
    /// RS256 public key in PEM form
    RsaPem(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Base URL of the history service, e.g. "http://localhost:5003".
    /// Never has a trailing slash.
    pub history_service_url: String,

    /// Key used to verify `Authorization: Bearer` tokens
    pub jwt_key: JwtKey,

    /// Expected `aud` claim, checked only when set
    pub jwt_audience: Option<String>,

    /// Expected `iss` claim, checked only when set
    pub jwt_issuer: Option<String>,

    /// Number of redirects the walker follows after the first request
    pub max_hops: usize,

    /// Timeout for hop fetches, the TLS check and the raw TLS handshake
    pub probe_timeout: Duration,

    /// Timeout for registration-date lookups
    pub whois_timeout: Duration,

    /// Timeout for hostname resolution
    pub dns_timeout: Duration,

    /// RDAP endpoint queried for domain registration dates, without trailing slash
    pub rdap_base_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8003".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let jwt_key = match (
            non_empty_var("AUTH_JWT_PUBLIC_KEY"),
            non_empty_var("AUTH_JWT_SECRET"),
        ) {
            (Some(pem), _) => JwtKey::RsaPem(pem),
            (None, Some(secret)) => JwtKey::Secret(secret),
            (None, None) => anyhow::bail!(
                "AUTH_JWT_SECRET or AUTH_JWT_PUBLIC_KEY must be set in the environment or .env file"
            ),
        };

        let history_service_url = std::env::var("HISTORY_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:5003".into())
            .trim_end_matches('/')
            .to_owned();

        let rdap_base_url = std::env::var("RDAP_BASE_URL")
            .unwrap_or_else(|_| "https://rdap.org".into())
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            history_service_url,
            jwt_key,
            jwt_audience: non_empty_var("AUTH_JWT_AUDIENCE"),
            jwt_issuer: non_empty_var("AUTH_JWT_ISSUER"),
            max_hops: parse_or("MAX_HOPS", crate::walker::DEFAULT_MAX_HOPS),
            probe_timeout: Duration::from_secs(parse_or("PROBE_TIMEOUT_SECS", 5)),
            whois_timeout: Duration::from_secs(parse_or("WHOIS_TIMEOUT_SECS", 10)),
            dns_timeout: Duration::from_secs(parse_or("DNS_TIMEOUT_SECS", 5)),
            rdap_base_url,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a numeric variable, falling back to `default` when unset or malformed.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
impl AppConfig {
    /// Configuration used by unit tests; never read from the environment.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            history_service_url: "http://history.test".into(),
            jwt_key: JwtKey::Secret("test-secret-key-at-least-32-characters-long".into()),
            jwt_audience: None,
            jwt_issuer: None,
            max_hops: crate::walker::DEFAULT_MAX_HOPS,
            probe_timeout: Duration::from_secs(5),
            whois_timeout: Duration::from_secs(10),
            dns_timeout: Duration::from_secs(5),
            rdap_base_url: "https://rdap.test".into(),
        }
    }
}
