use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use common::auth::Session;
use common::link::LinkKey;

use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct Config {
    // storage configuration
    /// the private base directory, created on start if missing
    pub private_base_dir: PathBuf,
    /// public uploads directory uploads are relocated out of
    pub public_upload_root: PathBuf,
    /// URL the public uploads directory is served under
    pub public_upload_url: String,
    pub upload_marker: String,
    pub private_url_prefix: String,

    // link configuration
    /// base for minted links
    pub site_url: Url,
    pub link_key: LinkKey,
    pub link_ttl: Duration,

    // authorization
    /// credential to session table
    pub sessions: BTreeMap<String, Session>,

    // http server configuration - separate listeners for API and gateway
    /// Bind address for the API HTTP server (loopback by default).
    pub api_host: IpAddr,
    /// Port for the API HTTP server (private, rewrite/render/mint).
    pub api_port: u16,
    pub gateway_host: IpAddr,
    /// Port for the gateway HTTP server (public, downloads).
    pub gateway_port: u16,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
    /// Install the tracing response observer
    pub tap_responses: bool,
}

impl Config {
    /// Build a service config from on-disk state, loading the link key.
    pub fn from_app_state(state: &AppState) -> Result<Self, crate::state::StateError> {
        let config = &state.config;
        Ok(Self {
            private_base_dir: config.private_base_dir.clone(),
            public_upload_root: config.public_upload_root.clone(),
            public_upload_url: config.public_upload_url.clone(),
            upload_marker: config.upload_marker.clone(),
            private_url_prefix: config.private_url_prefix.clone(),
            site_url: config.site_url.clone(),
            link_key: state.load_key()?,
            link_ttl: Duration::from_secs(config.link_ttl_secs),
            sessions: config.sessions.clone(),
            api_host: config.api_host,
            api_port: config.api_port,
            gateway_host: config.gateway_host,
            gateway_port: config.gateway_port,
            log_level: tracing::Level::INFO,
            log_dir: None,
            tap_responses: config.tap_responses,
        })
    }

    pub fn api_addr(&self) -> SocketAddr {
        SocketAddr::new(self.api_host, self.api_port)
    }

    pub fn gateway_addr(&self) -> SocketAddr {
        SocketAddr::new(self.gateway_host, self.gateway_port)
    }
}
