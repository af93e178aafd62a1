//! Shared test utilities for the private upload lifecycle tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::common::gate::DownloadGate;
use ::common::link::{LinkKey, LinkSigner};
use ::common::render::LinkRenderer;
use ::common::rewrite::{
    ReferenceRewriter, UploadLocator, DEFAULT_PRIVATE_URL_PREFIX, DEFAULT_UPLOAD_MARKER,
};
use ::common::store::PrivateStore;
use tempfile::TempDir;
use time::OffsetDateTime;
use url::Url;

pub const PUBLIC_UPLOAD_URL: &str = "https://site.example/wp-content/uploads";
pub const SITE_URL: &str = "https://site.example/";

/// A site with a public uploads root and a private store side by side.
pub struct TestSite {
    pub temp: TempDir,
    pub public_root: PathBuf,
    pub rewriter: ReferenceRewriter,
    pub renderer: LinkRenderer,
    pub gate: DownloadGate,
}

impl TestSite {
    pub fn private_root(&self) -> &Path {
        self.rewriter.store().base_dir()
    }

    /// Write a file under the public uploads root, returning its public URL.
    pub fn upload(&self, relative: &str, content: &[u8]) -> String {
        let path = self.public_root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        format!("{}/{}", PUBLIC_UPLOAD_URL, relative)
    }
}

pub fn setup_site() -> TestSite {
    let temp = TempDir::new().unwrap();
    let public_root = temp.path().join("public/wp-content/uploads");
    let store = PrivateStore::new(temp.path().join("private"));
    store.ensure_base_dir().unwrap();

    let locator = UploadLocator::new(
        &public_root,
        PUBLIC_UPLOAD_URL,
        DEFAULT_PRIVATE_URL_PREFIX,
        DEFAULT_UPLOAD_MARKER,
    )
    .unwrap();
    let signer = LinkSigner::new(LinkKey::generate().unwrap(), Duration::from_secs(600));
    let rewriter = ReferenceRewriter::new(store.clone(), locator);
    let renderer = LinkRenderer::new(rewriter.clone(), signer.clone(), Url::parse(SITE_URL).unwrap());
    let gate = DownloadGate::new(store, signer);

    TestSite {
        temp,
        public_root,
        rewriter,
        renderer,
        gate,
    }
}

pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
