use clap::Args;

use common::render::Rendered;
use privy_daemon::http_server::api::client::ApiError;
use privy_daemon::http_server::api::v0::links::RenderRequest;

#[derive(Args, Debug, Clone)]
pub struct Render {
    #[command(flatten)]
    pub request: RenderRequest,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Render {
    type Error = RenderError;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<String, Self::Error> {
        let output = match ctx.client.call(self.request.clone()).await? {
            Rendered::PassThrough { values } => values.join("\n"),
            Rendered::Markup { markup } => markup,
            Rendered::Empty => "(empty)".to_string(),
        };
        Ok(output)
    }
}
