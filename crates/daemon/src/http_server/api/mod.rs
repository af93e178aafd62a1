use axum::Router;

pub mod client;
pub mod v0;

use crate::ServiceState;

/// API routes. No CORS layer: callers are the form backend and the CLI,
/// never a browser, so cross-origin requests get no grant.
pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/v0", v0::router(state.clone()))
        .with_state(state)
}
