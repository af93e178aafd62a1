use std::path::PathBuf;

use clap::Args;
use url::Url;

use privy_daemon::state::{AppConfig, AppState, StateError, PRIVATE_DIR_NAME};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Private base directory (default: <config dir>/private)
    #[arg(long)]
    pub private_base_dir: Option<PathBuf>,

    /// Public uploads directory to relocate from
    #[arg(long)]
    pub public_upload_root: Option<PathBuf>,

    /// URL the public uploads directory is served under
    #[arg(long)]
    pub public_upload_url: Option<String>,

    /// Base URL for minted download links
    #[arg(long)]
    pub site_url: Option<Url>,

    #[arg(long)]
    pub api_port: Option<u16>,

    #[arg(long)]
    pub gateway_port: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<String, Self::Error> {
        let privy_dir = AppState::privy_dir(ctx.config_path.clone())?;

        let defaults = AppConfig::default();
        let config = AppConfig {
            private_base_dir: self
                .private_base_dir
                .clone()
                .unwrap_or_else(|| privy_dir.join(PRIVATE_DIR_NAME)),
            public_upload_root: self
                .public_upload_root
                .clone()
                .unwrap_or(defaults.public_upload_root),
            public_upload_url: self
                .public_upload_url
                .clone()
                .unwrap_or(defaults.public_upload_url),
            site_url: self.site_url.clone().unwrap_or(defaults.site_url),
            api_port: self.api_port.unwrap_or(defaults.api_port),
            gateway_port: self.gateway_port.unwrap_or(defaults.gateway_port),
            ..defaults
        };

        let state = AppState::init(Some(privy_dir), Some(config))?;

        let mut output = format!("Initialized privy directory at {}", state.privy_dir.display());
        output.push_str(&format!(
            "\n  private base dir: {}",
            state.config.private_base_dir.display()
        ));
        output.push_str(&format!("\n  site url:         {}", state.config.site_url));
        output.push_str(&format!("\n  API port:         {}", state.config.api_port));
        output.push_str(&format!("\n  gateway port:     {}", state.config.gateway_port));
        output.push_str("\n\nAdd credentials under [sessions] in config.toml before serving downloads.");
        Ok(output)
    }
}
