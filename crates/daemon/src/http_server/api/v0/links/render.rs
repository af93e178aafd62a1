use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use common::render::{RenderError, Rendered};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

const ROUTE: &str = "/api/v0/links/render";

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct RenderRequest {
    /// Stored values to render
    #[arg(required = true)]
    pub values: Vec<String>,

    /// Render markup for a human instead of passing values through
    #[arg(long)]
    #[serde(default)]
    pub display: bool,
}

#[tracing::instrument(skip_all, fields(count = req.values.len(), display = req.display))]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RenderRequest>,
) -> Result<impl IntoResponse, RenderApiError> {
    // Legacy values may be relocated while rendering
    let rendered = tokio::task::spawn_blocking(move || {
        state
            .renderer()
            .render(req.values, req.display, OffsetDateTime::now_utc())
    })
    .await
    .map_err(|e| RenderApiError::Worker(e.to_string()))??;

    Ok((http::StatusCode::OK, Json(rendered)))
}

#[derive(Debug, thiserror::Error)]
pub enum RenderApiError {
    #[error("render worker failed: {0}")]
    Worker(String),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl IntoResponse for RenderApiError {
    fn into_response(self) -> Response {
        tracing::error!("RENDER ERROR: {:?}", self);
        (
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "render failed".to_string(),
        )
            .into_response()
    }
}

impl ApiRequest for RenderRequest {
    type Response = Rendered;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(ROUTE)?;
        Ok(client.post(full_url).json(&self))
    }
}
