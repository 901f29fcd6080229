use crate::{
    auth::AuthUser,
    error::ApiError,
    explain, heuristics,
    history::HistoryError,
    models::{AnalyzeResponse, DetailsResponse},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;

/// POST /link/analyze
///
/// 1. Authenticate (the `AuthUser` extractor rejects before the body is read).
/// 2. Walk the redirect chain and run the checklist over it.
/// 3. Persist the verdict through the history service with the caller's token.
/// 4. Return the verdict together with the stored record id.
pub async fn analyze(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(body) = body?;
    let url = body
        .get("url")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Field 'url' (string) is required".into()))?
        .to_owned();

    tracing::info!("analysing {} for {}", url, auth.uid);
    let chain = state.walker.walk(&url).await;
    let result = heuristics::evaluate(chain, &url);
    tracing::info!(
        "{} analysed: safe={} issues={}",
        url,
        result.safe,
        result.issues.len()
    );

    // A failed save loses the verdict from the caller's point of view even
    // though the analysis itself succeeded.
    let id = state
        .history
        .save(&auth.token, &url, &result)
        .await
        .map_err(|e| {
            let detail = match &e {
                HistoryError::Rejected { status, body } => {
                    format!("Failed to save link history: {} {}", status.as_u16(), body)
                }
                HistoryError::Transport(err) => format!("Failed to save link history: {err}"),
            };
            ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                detail,
            }
        })?;

    Ok(Json(AnalyzeResponse { id, result }))
}

/// GET /link/details/:record_id
///
/// Load a saved analysis and attach an explanation to each of its issues.
pub async fn details(
    auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let record = state
        .history
        .fetch(&auth.token, &record_id)
        .await
        .map_err(|e| match e {
            HistoryError::Rejected { status, body } => ApiError::Upstream {
                status,
                detail: body,
            },
            HistoryError::Transport(err) => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                detail: err.to_string(),
            },
        })?;

    let explanations = explain::explain(&record.issues);
    Ok(Json(DetailsResponse {
        record,
        explanations,
    }))
}
