//! Shared setup for the HTTP integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::response::Response;
use axum::Router;
use http::Request;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use url::Url;

use ::common::auth::{Role, Session};
use ::common::link::LinkKey;
use ::common::path::sanitize;
use ::common::rewrite::{DEFAULT_PRIVATE_URL_PREFIX, DEFAULT_UPLOAD_MARKER};
use privy_daemon::http_server::{api_router, gateway_router};
use privy_daemon::{ServiceConfig, ServiceState};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const MEMBER_TOKEN: &str = "member-token";
pub const PUBLIC_UPLOAD_URL: &str = "https://site.example/wp-content/uploads";
pub const SITE_URL: &str = "https://site.example/";

pub struct TestService {
    pub temp: TempDir,
    pub config: ServiceConfig,
    pub state: ServiceState,
}

impl TestService {
    pub fn api(&self) -> Router {
        api_router(self.state.clone())
    }

    pub fn gateway(&self) -> Router {
        gateway_router(self.state.clone())
    }

    pub fn private_root(&self) -> &Path {
        &self.config.private_base_dir
    }

    pub fn public_root(&self) -> &Path {
        &self.config.public_upload_root
    }

    /// Write a file straight into the private store.
    pub fn put_private(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.private_root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a file under the public uploads root, returning its public URL.
    pub fn upload(&self, relative: &str, content: &[u8]) -> String {
        let path = self.public_root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        format!("{}/{}", PUBLIC_UPLOAD_URL, relative)
    }

    /// Mint a link for `relative` and return its gateway path and query.
    pub fn download_uri(&self, relative: &str) -> String {
        let renderer = self.state.renderer();
        let link = renderer
            .signer()
            .mint(&sanitize(relative).unwrap(), OffsetDateTime::now_utc());
        path_and_query(&link.to_url(renderer.site_url()))
    }
}

pub fn setup_service() -> TestService {
    let temp = TempDir::new().unwrap();

    let mut sessions = BTreeMap::new();
    sessions.insert(
        ADMIN_TOKEN.to_string(),
        Session::new("ops", Role::Administrator),
    );
    sessions.insert(MEMBER_TOKEN.to_string(), Session::new("jane", Role::Member));

    let config = ServiceConfig {
        private_base_dir: temp.path().join("private"),
        public_upload_root: temp.path().join("public/wp-content/uploads"),
        public_upload_url: PUBLIC_UPLOAD_URL.to_string(),
        upload_marker: DEFAULT_UPLOAD_MARKER.to_string(),
        private_url_prefix: DEFAULT_PRIVATE_URL_PREFIX.to_string(),
        site_url: Url::parse(SITE_URL).unwrap(),
        link_key: LinkKey::generate().unwrap(),
        link_ttl: Duration::from_secs(600),
        sessions,
        api_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        api_port: 0,
        gateway_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        gateway_port: 0,
        log_level: tracing::Level::DEBUG,
        log_dir: None,
        tap_responses: false,
    };
    let state = ServiceState::from_config(&config).unwrap();

    TestService {
        temp,
        config,
        state,
    }
}

pub fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

pub async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}
