use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::v0::observed_json;
use crate::ServiceState;

const ROUTE: &str = "/api/v0/payload/rewrite";

/// A submission payload, sent as the request body as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewriteRequest(pub Value);

/// Relocate every upload referenced by the payload and return it with
/// private references in their place. Leaves that cannot be relocated are
/// returned unchanged, so this never fails the caller's save.
#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(RewriteRequest(mut payload)): Json<RewriteRequest>,
) -> Result<Response, RewriteError> {
    let worker = state.clone();
    let (payload, summary) = tokio::task::spawn_blocking(move || {
        let summary = worker.rewriter().rewrite_in_place(&mut payload);
        (payload, summary)
    })
    .await
    .map_err(|e| RewriteError::Worker(e.to_string()))?;

    tracing::info!(
        rewritten = summary.rewritten,
        failed = summary.failed,
        "payload rewritten"
    );
    Ok(observed_json(&state, ROUTE, &payload))
}

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("rewrite worker failed: {0}")]
    Worker(String),
}

impl IntoResponse for RewriteError {
    fn into_response(self) -> Response {
        tracing::error!("REWRITE ERROR: {:?}", self);
        (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "rewrite failed".to_string(),
        )
            .into_response()
    }
}

impl ApiRequest for RewriteRequest {
    type Response = Value;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(ROUTE)?;
        Ok(client.post(full_url).json(&self))
    }
}
