use axum::response::{IntoResponse, Response};
use axum::Router;
use http::{header, StatusCode};
use serde::Serialize;

pub mod links;
pub mod payload;
pub mod uploads;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/payload", payload::router(state.clone()))
        .nest("/links", links::router(state.clone()))
        .nest("/uploads", uploads::router(state.clone()))
        .with_state(state)
}

/// Serialize `value` as the JSON response body, showing it to the response
/// observer first if one is installed.
pub(crate) fn observed_json<T: Serialize>(
    state: &ServiceState,
    route: &str,
    value: &T,
) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => {
            if let Some(observer) = state.observer() {
                observer.observe(route, &body);
            }
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(route = %route, error = %e, "failed to serialize response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
