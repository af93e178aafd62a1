use axum::routing::post;
use axum::Router;

use crate::ServiceState;

pub mod target;

pub use target::TargetRequest;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/target", post(target::handler))
        .with_state(state)
}
