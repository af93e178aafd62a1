use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::*;

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let failure = |message: &str| {
        let msg = serde_json::json!({"status": "failure", "message": message});
        (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
    };

    match timeout(READINESS_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => {
            let msg = serde_json::json!({"status": "ok"});
            (StatusCode::OK, Json(msg)).into_response()
        }
        Ok(Err(DataSourceError::DependencyFailure)) => failure("private storage is unavailable"),
        Ok(Err(DataSourceError::ShuttingDown)) => failure("service is shutting down"),
        Err(_) => failure("readiness check timed out"),
    }
}
