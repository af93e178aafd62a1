//! Rewriting upload references inside submission payloads.
//!
//! A submission payload is any JSON value. Every string leaf that points at a
//! public upload is relocated into the private store and replaced by an
//! `ff-private://` reference; every other leaf is left exactly as it was.

mod locate;

use serde_json::Value;

use crate::path::RelativePath;
use crate::reference::PrivateReference;
use crate::store::{PrivateStore, StoreError};

pub use locate::{
    Located, LocatorError, UploadLocator, DEFAULT_PRIVATE_URL_PREFIX, DEFAULT_UPLOAD_MARKER,
};

/// Counts from a single rewrite pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Leaves replaced by a private reference.
    pub rewritten: usize,
    /// Leaves that looked like uploads but could not be relocated.
    pub failed: usize,
}

/// Result of processing a single string leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafOutcome {
    Unchanged,
    Rewritten(PrivateReference),
    Failed,
}

#[derive(Debug, Clone)]
pub struct ReferenceRewriter {
    store: PrivateStore,
    locator: UploadLocator,
}

impl ReferenceRewriter {
    pub fn new(store: PrivateStore, locator: UploadLocator) -> Self {
        Self { store, locator }
    }

    pub fn store(&self) -> &PrivateStore {
        &self.store
    }

    pub fn locator(&self) -> &UploadLocator {
        &self.locator
    }

    /// Rewrite a payload, returning one of the same shape.
    ///
    /// Never fails: leaves that cannot be processed are returned unchanged.
    pub fn rewrite(&self, mut payload: Value) -> Value {
        self.rewrite_in_place(&mut payload);
        payload
    }

    /// Rewrite a payload in place.
    pub fn rewrite_in_place(&self, payload: &mut Value) -> RewriteSummary {
        let mut summary = RewriteSummary::default();
        self.visit(payload, &mut summary);
        summary
    }

    fn visit(&self, value: &mut Value, summary: &mut RewriteSummary) {
        match value {
            Value::String(leaf) => match self.rewrite_leaf(leaf) {
                LeafOutcome::Rewritten(reference) => {
                    *leaf = reference.to_string();
                    summary.rewritten += 1;
                }
                LeafOutcome::Failed => summary.failed += 1,
                LeafOutcome::Unchanged => {}
            },
            Value::Array(items) => {
                for item in items {
                    self.visit(item, summary);
                }
            }
            Value::Object(map) => {
                for item in map.values_mut() {
                    self.visit(item, summary);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    /// Process one string leaf.
    pub fn rewrite_leaf(&self, value: &str) -> LeafOutcome {
        if PrivateReference::is_reference(value) {
            return LeafOutcome::Unchanged;
        }
        match self.locator.locate(value) {
            None => LeafOutcome::Unchanged,
            Some(Located::Private(relative)) => {
                LeafOutcome::Rewritten(PrivateReference::new(relative))
            }
            Some(Located::Public { source, relative }) => {
                match self.store.relocate(&source, &relative) {
                    Ok(relocation) => LeafOutcome::Rewritten(relocation.reference),
                    Err(StoreError::SourceMissing(path)) => {
                        tracing::warn!(
                            value = %value,
                            source = %path.display(),
                            "upload reference points at a missing file, leaving it unchanged"
                        );
                        LeafOutcome::Failed
                    }
                    Err(e) => {
                        tracing::error!(
                            value = %value,
                            error = %e,
                            "relocation failed, upload remains publicly reachable"
                        );
                        LeafOutcome::Failed
                    }
                }
            }
        }
    }

    /// Resolve a stored value to a private relative path for display.
    ///
    /// References are unwrapped directly. Legacy values written before
    /// rewriting existed are relocated on the spot.
    pub fn resolve(&self, value: &str) -> Option<RelativePath> {
        if PrivateReference::is_reference(value) {
            return PrivateReference::parse(value)
                .ok()
                .map(PrivateReference::into_relative);
        }
        match self.rewrite_leaf(value) {
            LeafOutcome::Rewritten(reference) => Some(reference.into_relative()),
            LeafOutcome::Unchanged | LeafOutcome::Failed => None,
        }
    }
}
