use axum::routing::post;
use axum::Router;

use crate::ServiceState;

pub mod mint;
pub mod render;

pub use mint::MintRequest;
pub use render::RenderRequest;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/render", post(render::handler))
        .route("/mint", post(mint::handler))
        .with_state(state)
}
