use clap::Args;
use time::OffsetDateTime;

use common::path::{sanitize, SanitizeError};
use privy_daemon::http_server::api::client::ApiError;
use privy_daemon::http_server::api::v0::links::MintRequest;
use privy_daemon::state::StateError;

/// Mint a download link, locally unless `--daemon` is given
#[derive(Args, Debug, Clone)]
pub struct Link {
    /// Path relative to the private base directory
    pub path: String,

    /// Lifetime in seconds (default from config)
    #[arg(long, conflicts_with = "daemon")]
    pub ttl: Option<u64>,

    /// Have the running daemon mint the link with its own key and lifetime
    #[arg(long)]
    pub daemon: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
    #[error("invalid path: {0}")]
    InvalidPath(#[from] SanitizeError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Link {
    type Error = LinkError;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<String, Self::Error> {
        let relative = sanitize(&self.path)?;

        if self.daemon {
            let minted = ctx
                .client
                .call(MintRequest {
                    path: relative.to_string(),
                })
                .await?;
            return Ok(minted.url);
        }

        let state = ctx.app_state()?;
        let link = ctx
            .signer(&state, self.ttl)?
            .mint(&relative, OffsetDateTime::now_utc());
        Ok(link.to_url(&state.config.site_url).to_string())
    }
}
