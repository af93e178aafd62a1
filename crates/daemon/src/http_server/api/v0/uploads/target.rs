use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::store::{StoreError, UploadTarget};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::v0::observed_json;
use crate::ServiceState;

const ROUTE: &str = "/api/v0/uploads/target";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetRequest {
    /// Date bucket the upload would have used, e.g. `/2026/02`
    #[serde(default)]
    pub subdir: String,
}

/// Where a fresh upload should be written so that it never touches the
/// public uploads directory.
#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<TargetRequest>,
) -> Result<Response, TargetError> {
    let target = state
        .store()
        .upload_target(&req.subdir, state.private_base_url())?;
    Ok(observed_json(&state, ROUTE, &target))
}

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for TargetError {
    fn into_response(self) -> Response {
        match self {
            TargetError::Store(StoreError::PathInvalid(e)) => {
                (http::StatusCode::BAD_REQUEST, format!("Invalid subdir: {}", e)).into_response()
            }
            TargetError::Store(e) => {
                tracing::error!(error = %e, "failed to prepare upload target");
                (
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "private storage unavailable".to_string(),
                )
                    .into_response()
            }
        }
    }
}

impl ApiRequest for TargetRequest {
    type Response = UploadTarget;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(ROUTE)?;
        Ok(client.post(full_url).json(&self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_posts_subdir_to_route() {
        let base = Url::parse("http://127.0.0.1:5001").unwrap();
        let request = TargetRequest {
            subdir: "/2026/02".to_string(),
        }
        .build_request(&base, &Client::new())
        .unwrap()
        .build()
        .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:5001/api/v0/uploads/target"
        );
        let body = request.body().and_then(|body| body.as_bytes()).unwrap();
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(body, serde_json::json!({"subdir": "/2026/02"}));
    }
}
