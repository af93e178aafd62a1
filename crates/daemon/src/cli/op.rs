use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use common::link::LinkSigner;
use privy_daemon::http_server::api::client::{ApiClient, ApiError};
use privy_daemon::state::{AppConfig, AppState, StateError};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("invalid API address: {0}")]
    Remote(#[from] url::ParseError),
    #[error("failed to create API client: {0}")]
    Client(#[from] ApiError),
}

/// Everything an op may need: the daemon's API and the on-disk state.
#[derive(Clone)]
pub struct OpContext {
    pub client: ApiClient,
    /// Config directory override (defaults to ~/.privy)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    /// `--remote` wins; otherwise talk to the API the local config describes.
    pub fn new(remote: Option<Url>, config_path: Option<PathBuf>) -> Result<Self, ContextError> {
        let remote = match remote {
            Some(url) => url,
            None => local_api_url(config_path.clone())?,
        };
        Ok(Self {
            client: ApiClient::new(&remote)?,
            config_path,
        })
    }

    pub fn app_state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// Signer over the configured key, with `ttl_secs` overriding the configured lifetime.
    pub fn signer(&self, state: &AppState, ttl_secs: Option<u64>) -> Result<LinkSigner, StateError> {
        let ttl = Duration::from_secs(ttl_secs.unwrap_or(state.config.link_ttl_secs));
        Ok(LinkSigner::new(state.load_key()?, ttl))
    }
}

/// API URL for the daemon configured under `config_path`, or for a
/// default install when no config can be read.
pub fn local_api_url(config_path: Option<PathBuf>) -> Result<Url, url::ParseError> {
    let (host, port) = match AppState::load(config_path) {
        Ok(state) => (state.config.api_host, state.config.api_port),
        Err(_) => {
            let defaults = AppConfig::default();
            (defaults.api_host, defaults.api_port)
        }
    };
    api_url(host, port)
}

/// A wildcard bind address is reached over loopback.
fn api_url(host: IpAddr, port: u16) -> Result<Url, url::ParseError> {
    let host = match host {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    Url::parse(&format!("http://{}", SocketAddr::new(host, port)))
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// Run the op, returning the text printed on success.
    async fn execute(&self, ctx: &OpContext) -> Result<String, Self::Error>;
}

/// Builds the `Command` subcommand enum and its `CommandError` from a
/// list of op types, each becoming a variant of the same name.
#[macro_export]
macro_rules! command_enum {
    ($($op:ident),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($op($op),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum CommandError {
            $(
                #[error(transparent)]
                $op(<$op as $crate::cli::op::Op>::Error),
            )*
        }

        impl Command {
            pub async fn run(&self, ctx: &$crate::cli::op::OpContext) -> Result<String, CommandError> {
                use $crate::cli::op::Op;
                match self {
                    $(Command::$op(op) => op.execute(ctx).await.map_err(CommandError::$op),)*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_bind_resolves_to_loopback() {
        let url = api_url(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5001).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5001/");

        let url = api_url(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 5001).unwrap();
        assert_eq!(url.as_str(), "http://[::1]:5001/");
    }

    #[test]
    fn test_configured_host_is_kept() {
        let host: IpAddr = "10.0.0.7".parse().unwrap();
        let url = api_url(host, 7000).unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.7:7000/");
    }

    #[test]
    fn test_missing_config_uses_default_install() {
        let temp = tempfile::TempDir::new().unwrap();
        let url = local_api_url(Some(temp.path().join("absent"))).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(url.port(), Some(defaults.api_port));
        assert_eq!(url.host_str(), Some("127.0.0.1"));
    }

    #[test]
    fn test_remote_flag_overrides_config() {
        let remote = Url::parse("http://example.com:9999").unwrap();
        let ctx = OpContext::new(Some(remote.clone()), None).unwrap();
        assert_eq!(ctx.client.base_url(), &remote);
    }

    #[test]
    fn test_context_reads_configured_api_port() {
        let temp = tempfile::TempDir::new().unwrap();
        let privy_dir = temp.path().join("privy");
        let config = AppConfig {
            private_base_dir: temp.path().join("private"),
            api_port: 6123,
            ..AppConfig::default()
        };
        AppState::init(Some(privy_dir.clone()), Some(config)).unwrap();

        let ctx = OpContext::new(None, Some(privy_dir)).unwrap();
        assert_eq!(ctx.client.base_url().as_str(), "http://127.0.0.1:6123/");
    }
}
