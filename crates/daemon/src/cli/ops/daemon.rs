use clap::Args;

use privy_daemon::state::StateError;
use privy_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Override gateway server port (default from config)
    #[arg(long)]
    pub gateway_port: Option<u16>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,

    /// Log at debug level
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<String, Self::Error> {
        let state = ctx.app_state()?;
        let mut config = ServiceConfig::from_app_state(&state)?;

        if let Some(port) = self.api_port {
            config.api_port = port;
        }
        if let Some(port) = self.gateway_port {
            config.gateway_port = port;
        }
        config.log_dir = self.log_dir.clone();
        config.log_level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
