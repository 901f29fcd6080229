//! Client for the external history service that persists analyses.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::models::{AnalysisResult, StoredRecord};

/// History-service collection this service writes to.
const COLLECTION: &str = "linkAnalyser";

const SAVE_TIMEOUT: Duration = Duration::from_secs(10);
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The service answered with an unexpected status.
    #[error("{status} {body}")]
    Rejected { status: StatusCode, body: String },

    /// The service could not be reached or returned an unreadable body.
    #[error("history service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist an analysis on behalf of the caller owning `token`; returns the
    /// new record id when the service reports one.
    async fn save(
        &self,
        token: &str,
        url: &str,
        result: &AnalysisResult,
    ) -> Result<Option<String>, HistoryError>;

    /// Load a previously saved analysis.
    async fn fetch(&self, token: &str, record_id: &str) -> Result<StoredRecord, HistoryError>;
}

// ── Wire shapes ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SaveRequest<'a> {
    data: SavedAnalysis<'a>,
}

#[derive(Serialize)]
struct SavedAnalysis<'a> {
    url: &'a str,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

#[derive(Deserialize)]
struct SaveResponse {
    id: Option<String>,
}

// ── reqwest implementation ─────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct HttpHistoryClient {
    client: Client,
    collection_url: Url,
}

impl HttpHistoryClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid history service URL {base_url:?}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("history service URL {base_url:?} cannot carry a path");
        }
        let collection_url = Url::parse(&format!(
            "{}/history/{}",
            base.as_str().trim_end_matches('/'),
            COLLECTION
        ))?;
        Ok(Self {
            client: Client::builder().build()?,
            collection_url,
        })
    }

    /// URL of one record. The id is always a single percent-encoded path
    /// segment, so it cannot climb out of the collection.
    fn record_url(&self, record_id: &str) -> Url {
        let mut url = self.collection_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(record_id);
        }
        url
    }
}

#[async_trait]
impl HistoryStore for HttpHistoryClient {
    async fn save(
        &self,
        token: &str,
        url: &str,
        result: &AnalysisResult,
    ) -> Result<Option<String>, HistoryError> {
        let resp = self
            .client
            .post(self.collection_url.clone())
            .bearer_auth(token)
            .timeout(SAVE_TIMEOUT)
            .json(&SaveRequest {
                data: SavedAnalysis { url, result },
            })
            .send()
            .await?;

        if resp.status() != StatusCode::CREATED {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("history service rejected save: {} {}", status, body);
            return Err(HistoryError::Rejected { status, body });
        }

        let saved: SaveResponse = resp.json().await?;
        Ok(saved.id)
    }

    async fn fetch(&self, token: &str, record_id: &str) -> Result<StoredRecord, HistoryError> {
        let resp = self
            .client
            .get(self.record_url(record_id))
            .bearer_auth(token)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("history service lookup of {} failed: {}", record_id, status);
            return Err(HistoryError::Rejected { status, body });
        }

        Ok(resp.json().await?)
    }
}
