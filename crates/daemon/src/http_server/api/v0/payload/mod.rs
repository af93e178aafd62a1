use axum::routing::post;
use axum::Router;

use crate::ServiceState;

pub mod rewrite;

pub use rewrite::RewriteRequest;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/rewrite", post(rewrite::handler))
        .with_state(state)
}
