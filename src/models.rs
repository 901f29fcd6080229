use serde::{Deserialize, Serialize};

/// Sentinel stored in `domain_age_days` when the registration date is unknown.
pub const UNKNOWN_DOMAIN_AGE: i64 = -1;

/// One redirect hop. A hop either produced an HTTP response (`Fetched`) or
/// failed before one arrived (`Failed`), which ends the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HopRecord {
    Fetched(FetchedHop),
    Failed(FailedHop),
}

/// Diagnostics for a hop that returned an HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedHop {
    pub url: String,
    pub status_code: u16,
    pub ip: Option<String>,
    pub tls_valid: Option<bool>,
    pub cert_issuer: Option<String>,
    pub domain_age_days: i64,
    pub title: String,
    pub form_actions: Vec<String>,
}

/// A hop whose primary GET failed (network error, timeout, bad URL).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedHop {
    pub url: String,
    pub error: String,
}

impl HopRecord {
    pub fn url(&self) -> &str {
        match self {
            HopRecord::Fetched(hop) => &hop.url,
            HopRecord::Failed(hop) => &hop.url,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            HopRecord::Fetched(hop) => Some(hop.status_code),
            HopRecord::Failed(_) => None,
        }
    }

    pub fn tls_valid(&self) -> Option<bool> {
        match self {
            HopRecord::Fetched(hop) => hop.tls_valid,
            HopRecord::Failed(_) => None,
        }
    }

    pub fn domain_age_days(&self) -> i64 {
        match self {
            HopRecord::Fetched(hop) => hop.domain_age_days,
            HopRecord::Failed(_) => UNKNOWN_DOMAIN_AGE,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            HopRecord::Fetched(hop) => &hop.title,
            HopRecord::Failed(_) => "",
        }
    }

    pub fn form_actions(&self) -> &[String] {
        match self {
            HopRecord::Fetched(hop) => &hop.form_actions,
            HopRecord::Failed(_) => &[],
        }
    }
}

/// Verdict for one analysed link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub safe: bool,
    pub issues: Vec<String>,
    pub redirect_details: Vec<HopRecord>,
}

/// A detected issue paired with its human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueExplanation {
    pub issue: String,
    pub explanation: String,
}

/// Body returned by `POST /link/analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub id: Option<String>,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

/// A previously saved analysis as returned by the history service. Fields
/// other than `issues` are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// Body returned by `GET /link/details/:record_id`.
#[derive(Debug, Serialize)]
pub struct DetailsResponse {
    pub record: StoredRecord,
    pub explanations: Vec<IssueExplanation>,
}
