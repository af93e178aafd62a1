use std::path::PathBuf;

use clap::Args;

use privy_daemon::http_server::api::client::ApiError;
use privy_daemon::http_server::api::v0::payload::RewriteRequest;

#[derive(Args, Debug, Clone)]
pub struct Rewrite {
    /// JSON file holding the submission payload
    pub file: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("failed to read payload: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rewrite {
    type Error = RewriteError;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<String, Self::Error> {
        let raw = tokio::fs::read_to_string(&self.file).await?;
        let payload = serde_json::from_str(&raw)?;

        let rewritten = ctx.client.call(RewriteRequest(payload)).await?;
        Ok(serde_json::to_string_pretty(&rewritten)?)
    }
}
