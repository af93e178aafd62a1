use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use common::path::{sanitize, SanitizeError};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

const ROUTE: &str = "/api/v0/links/mint";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintRequest {
    /// Relative path inside the private store
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintResponse {
    pub url: String,
    /// Expiry as unix seconds
    pub expires: i64,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<MintRequest>,
) -> Result<impl IntoResponse, MintError> {
    let relative = sanitize(&req.path)?;
    let renderer = state.renderer();
    let link = renderer
        .signer()
        .mint(&relative, OffsetDateTime::now_utc());

    Ok((
        http::StatusCode::OK,
        Json(MintResponse {
            url: link.to_url(renderer.site_url()).to_string(),
            expires: link.expires,
        }),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] SanitizeError),
}

impl IntoResponse for MintError {
    fn into_response(self) -> Response {
        match self {
            MintError::InvalidPath(e) => {
                (http::StatusCode::BAD_REQUEST, format!("Invalid path: {}", e)).into_response()
            }
        }
    }
}

impl ApiRequest for MintRequest {
    type Response = MintResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(ROUTE)?;
        Ok(client.post(full_url).json(&self))
    }
}
