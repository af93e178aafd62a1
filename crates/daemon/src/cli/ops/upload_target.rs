use clap::Args;

use privy_daemon::http_server::api::client::ApiError;
use privy_daemon::http_server::api::v0::uploads::TargetRequest;

/// Ask the daemon where a fresh upload should be written
#[derive(Args, Debug, Clone)]
pub struct UploadTarget {
    /// Date bucket the upload would have used, e.g. /2026/02
    #[arg(long, default_value = "")]
    pub subdir: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadTargetError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("unprintable response: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for UploadTarget {
    type Error = UploadTargetError;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<String, Self::Error> {
        let target = ctx
            .client
            .call(TargetRequest {
                subdir: self.subdir.clone(),
            })
            .await?;
        Ok(serde_json::to_string_pretty(&target)?)
    }
}
