use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use common::auth::Session;
use common::link::{LinkKey, DEFAULT_LINK_TTL};
use common::rewrite::{DEFAULT_PRIVATE_URL_PREFIX, DEFAULT_UPLOAD_MARKER};

pub const APP_NAME: &str = "privy";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "link.key";
pub const PRIVATE_DIR_NAME: &str = "private";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the API server binds to. The API is unauthenticated, so
    /// it stays on loopback unless deliberately exposed.
    #[serde(default = "default_api_host")]
    pub api_host: IpAddr,
    /// Port for the API server (internal, rewrite/render/mint)
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_gateway_host")]
    pub gateway_host: IpAddr,
    /// Port for the gateway server (public, downloads)
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,
    /// Directory outside the web root holding every private upload
    #[serde(default = "default_private_base_dir")]
    pub private_base_dir: PathBuf,
    /// Public uploads directory that form uploads are moved out of
    #[serde(default = "default_public_upload_root")]
    pub public_upload_root: PathBuf,
    /// URL the public uploads directory is served under
    #[serde(default = "default_public_upload_url")]
    pub public_upload_url: String,
    /// Base for minted download links and fake private upload URLs
    #[serde(default = "default_site_url")]
    pub site_url: Url,
    #[serde(default = "default_upload_marker")]
    pub upload_marker: String,
    #[serde(default = "default_private_url_prefix")]
    pub private_url_prefix: String,
    #[serde(default = "default_link_ttl_secs")]
    pub link_ttl_secs: u64,
    /// Credential to session table used by the download gateway
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
    /// Log API response bodies at debug level
    #[serde(default)]
    pub tap_responses: bool,
}

fn default_api_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_gateway_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_api_port() -> u16 {
    5001
}

fn default_gateway_port() -> u16 {
    9090
}

fn default_private_base_dir() -> PathBuf {
    PathBuf::from("/var/lib/privy/private")
}

fn default_public_upload_root() -> PathBuf {
    PathBuf::from("/var/www/html/wp-content/uploads")
}

fn default_public_upload_url() -> String {
    "http://localhost/wp-content/uploads".to_string()
}

fn default_site_url() -> Url {
    Url::parse("http://localhost:9090/").expect("hardcoded URL must parse")
}

fn default_upload_marker() -> String {
    DEFAULT_UPLOAD_MARKER.to_string()
}

fn default_private_url_prefix() -> String {
    DEFAULT_PRIVATE_URL_PREFIX.to_string()
}

fn default_link_ttl_secs() -> u64 {
    DEFAULT_LINK_TTL.as_secs()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            api_port: default_api_port(),
            gateway_host: default_gateway_host(),
            gateway_port: default_gateway_port(),
            private_base_dir: default_private_base_dir(),
            public_upload_root: default_public_upload_root(),
            public_upload_url: default_public_upload_url(),
            site_url: default_site_url(),
            upload_marker: default_upload_marker(),
            private_url_prefix: default_private_url_prefix(),
            link_ttl_secs: default_link_ttl_secs(),
            sessions: BTreeMap::new(),
            tap_responses: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the privy directory (~/.privy)
    pub privy_dir: PathBuf,
    /// Path to the link signing key
    pub key_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the privy directory path (custom or default ~/.privy)
    pub fn privy_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new privy state directory
    ///
    /// Without an explicit config the private base directory is placed
    /// inside the state directory.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let privy_dir = Self::privy_dir(custom_path)?;

        if privy_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&privy_dir)?;

        let config = config.unwrap_or_else(|| AppConfig {
            private_base_dir: privy_dir.join(PRIVATE_DIR_NAME),
            ..AppConfig::default()
        });
        fs::create_dir_all(&config.private_base_dir)?;

        // Generate and save the link key
        let key = LinkKey::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        let key_path = privy_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, key.to_hex())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&key_path, fs::Permissions::from_mode(0o600))?;
        }

        let config_path = privy_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            privy_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the privy directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let privy_dir = Self::privy_dir(custom_path)?;

        if !privy_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = privy_dir.join(KEY_FILE_NAME);
        let config_path = privy_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            privy_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load the link signing key from the key file
    pub fn load_key(&self) -> Result<LinkKey, StateError> {
        let hex = fs::read_to_string(&self.key_path)?;
        LinkKey::from_hex(&hex).map_err(|e| StateError::InvalidKey(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("privy directory not initialized. Run 'privy init' first")]
    NotInitialized,

    #[error("privy directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
