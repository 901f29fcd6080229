//! Scriptable stand-ins for the network probes and the history service.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, net::IpAddr, sync::Arc, sync::Mutex};

use crate::{
    history::{HistoryError, HistoryStore},
    models::{AnalysisResult, StoredRecord},
    probe::{
        CertInspector, FetchError, FetchedPage, HostResolver, LookupError, PageFetcher, Probes,
        RegistrationLookup,
    },
};

#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Result<FetchedPage, FetchError>>,
    tls: HashMap<String, Result<bool, LookupError>>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn page(mut self, url: &str, status: u16, location: Option<&str>, body: &str) -> Self {
        self.pages.insert(
            url.into(),
            Ok(FetchedPage {
                status,
                location: location.map(str::to_owned),
                body: Some(body.to_owned()),
            }),
        );
        self
    }

    pub fn failing(mut self, url: &str, message: &str) -> Self {
        self.pages
            .insert(url.into(), Err(FetchError(message.to_owned())));
        self
    }

    pub fn tls(mut self, url: &str, outcome: Result<bool, LookupError>) -> Self {
        self.tls.insert(url.into(), outcome);
        self
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requested.lock().unwrap().push(url.to_owned());
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError(format!("no route to {url}"))))
    }

    async fn check_tls(&self, url: &str) -> Result<bool, LookupError> {
        self.tls
            .get(url)
            .cloned()
            .unwrap_or(Err(LookupError::Unavailable("unscripted".into())))
    }
}

pub struct FixedResolver(pub Option<IpAddr>);

#[async_trait]
impl HostResolver for FixedResolver {
    async fn resolve(&self, _host: &str) -> Result<IpAddr, LookupError> {
        self.0.ok_or(LookupError::NotFound)
    }
}

pub struct FixedIssuer(pub Option<&'static str>);

#[async_trait]
impl CertInspector for FixedIssuer {
    async fn issuer_cn(&self, _host: &str) -> Result<String, LookupError> {
        self.0
            .map(str::to_owned)
            .ok_or_else(|| LookupError::Unavailable("handshake failed".into()))
    }
}

pub struct FixedRegistration(pub Option<DateTime<Utc>>);

#[async_trait]
impl RegistrationLookup for FixedRegistration {
    async fn created_at(&self, _host: &str) -> Result<DateTime<Utc>, LookupError> {
        self.0.ok_or(LookupError::NotFound)
    }
}

/// Probes around `fetcher` with a resolvable host, issuer "R11" and a
/// domain registered five days ago.
pub fn probes_with(fetcher: Arc<FakeFetcher>) -> Probes {
    Probes {
        fetcher,
        resolver: Arc::new(FixedResolver(Some(IpAddr::from([203, 0, 113, 7])))),
        certs: Arc::new(FixedIssuer(Some("R11"))),
        registry: Arc::new(FixedRegistration(Some(Utc::now() - Duration::days(5)))),
    }
}

/// In-memory history service.
#[derive(Default)]
pub struct FakeHistory {
    /// `(token, url, result)` for every save call
    pub saved: Mutex<Vec<(String, String, AnalysisResult)>>,
    pub records: HashMap<String, StoredRecord>,
    /// When set, every call is rejected with this status and body.
    pub reject_with: Option<(u16, String)>,
}

impl FakeHistory {
    fn rejection(&self) -> Option<HistoryError> {
        self.reject_with.as_ref().map(|(status, body)| HistoryError::Rejected {
            status: reqwest::StatusCode::from_u16(*status)
                .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            body: body.clone(),
        })
    }
}

#[async_trait]
impl HistoryStore for FakeHistory {
    async fn save(
        &self,
        token: &str,
        url: &str,
        result: &AnalysisResult,
    ) -> Result<Option<String>, HistoryError> {
        if let Some(err) = self.rejection() {
            return Err(err);
        }
        let mut saved = self.saved.lock().unwrap();
        saved.push((token.to_owned(), url.to_owned(), result.clone()));
        Ok(Some(format!("rec-{}", saved.len())))
    }

    async fn fetch(&self, _token: &str, record_id: &str) -> Result<StoredRecord, HistoryError> {
        if let Some(err) = self.rejection() {
            return Err(err);
        }
        self.records
            .get(record_id)
            .cloned()
            .ok_or_else(|| HistoryError::Rejected {
                status: reqwest::StatusCode::NOT_FOUND,
                body: r#"{"error":"Not found"}"#.into(),
            })
    }
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve_stub(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

/// Base URL of a local port nothing is listening on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
