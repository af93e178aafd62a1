use std::sync::Arc;

use common::auth::Authorizer;
use common::gate::DownloadGate;
use common::link::LinkSigner;
use common::render::LinkRenderer;
use common::rewrite::{LocatorError, ReferenceRewriter, UploadLocator};
use common::store::{PrivateStore, StoreError};

use crate::auth::TokenAuthorizer;
use crate::observer::{ResponseObserver, TracingObserver};
use crate::service_config::Config;

/// Main service state, shared by both HTTP servers
#[derive(Clone)]
pub struct State {
    rewriter: Arc<ReferenceRewriter>,
    renderer: Arc<LinkRenderer>,
    gate: Arc<DownloadGate>,
    authorizer: Arc<dyn Authorizer>,
    observer: Option<Arc<dyn ResponseObserver>>,
    private_base_url: String,
}

impl State {
    pub fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let store = PrivateStore::new(&config.private_base_dir);
        store.ensure_base_dir()?;
        tracing::info!(path = %store.base_dir().display(), "private store ready");

        let locator = UploadLocator::new(
            &config.public_upload_root,
            &config.public_upload_url,
            &config.private_url_prefix,
            &config.upload_marker,
        )?;
        let signer = LinkSigner::new(config.link_key.clone(), config.link_ttl);
        let rewriter = ReferenceRewriter::new(store.clone(), locator);
        let renderer = LinkRenderer::new(rewriter.clone(), signer.clone(), config.site_url.clone());
        let gate = DownloadGate::new(store, signer);

        let private_base_url = format!(
            "{}/{}",
            config.site_url.as_str().trim_end_matches('/'),
            config.private_url_prefix.trim_matches('/')
        );

        let observer: Option<Arc<dyn ResponseObserver>> = if config.tap_responses {
            tracing::info!("response tap enabled");
            Some(Arc::new(TracingObserver))
        } else {
            None
        };

        Ok(Self {
            rewriter: Arc::new(rewriter),
            renderer: Arc::new(renderer),
            gate: Arc::new(gate),
            authorizer: Arc::new(TokenAuthorizer::new(&config.sessions)),
            observer,
            private_base_url,
        })
    }

    /// Replace the response observer.
    pub fn with_observer(mut self, observer: Arc<dyn ResponseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn rewriter(&self) -> &ReferenceRewriter {
        &self.rewriter
    }

    pub fn renderer(&self) -> &LinkRenderer {
        &self.renderer
    }

    pub fn gate(&self) -> &DownloadGate {
        &self.gate
    }

    pub fn store(&self) -> &PrivateStore {
        self.rewriter.store()
    }

    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    pub fn observer(&self) -> Option<&dyn ResponseObserver> {
        self.observer.as_deref()
    }

    /// Fake URL standing in for the private base directory.
    pub fn private_base_url(&self) -> &str {
        &self.private_base_url
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("private store error: {0}")]
    Store(#[from] StoreError),
    #[error("upload locator error: {0}")]
    Locator(#[from] LocatorError),
}
