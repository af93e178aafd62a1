use std::path::PathBuf;

use regex::Regex;

use crate::path::{sanitize, RelativePath};
use crate::reference::PrivateReference;

/// Marker segment under which the form plugin stores its uploads.
pub const DEFAULT_UPLOAD_MARKER: &str = "fluentform";

/// Path prefix of the fake URLs handed out for uploads written straight into
/// the private store.
pub const DEFAULT_PRIVATE_URL_PREFIX: &str = "/__ff_private_uploads__";

#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("upload marker must not be empty")]
    EmptyMarker,
    #[error("invalid upload marker {marker:?}: {source}")]
    Marker {
        marker: String,
        #[source]
        source: regex::Error,
    },
}

/// Where a value found in a payload points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// Already inside the private store; no relocation needed.
    Private(RelativePath),
    /// A public upload that still has to be moved into the private store.
    Public {
        source: PathBuf,
        relative: RelativePath,
    },
}

impl Located {
    pub fn relative(&self) -> &RelativePath {
        match self {
            Located::Private(relative) => relative,
            Located::Public { relative, .. } => relative,
        }
    }
}

/// Recognises upload references among arbitrary strings.
#[derive(Debug, Clone)]
pub struct UploadLocator {
    public_root: PathBuf,
    public_base_url: String,
    private_url_prefix: String,
    marker: String,
    marker_pattern: Regex,
}

impl UploadLocator {
    pub fn new(
        public_root: impl Into<PathBuf>,
        public_base_url: &str,
        private_url_prefix: &str,
        marker: &str,
    ) -> Result<Self, LocatorError> {
        let marker = marker.trim_matches('/').to_string();
        if marker.is_empty() {
            return Err(LocatorError::EmptyMarker);
        }
        let marker_pattern = Regex::new(&format!(
            r"(?:^|/){}/(?P<rest>[^?#]+)",
            regex::escape(&marker)
        ))
        .map_err(|source| LocatorError::Marker {
            marker: marker.clone(),
            source,
        })?;
        Ok(Self {
            public_root: public_root.into(),
            public_base_url: strip_scheme(public_base_url.trim_end_matches('/')).to_string(),
            private_url_prefix: format!("/{}/", private_url_prefix.trim_matches('/')),
            marker,
            marker_pattern,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Work out what `value` refers to, if anything.
    ///
    /// Recognised forms, in order: an `ff-private://` reference, a fake
    /// private-upload URL, a URL under the public uploads base URL, an
    /// absolute path under the public uploads root, and finally any URL or
    /// path containing the marker segment. Query strings and fragments are
    /// ignored. Values that sanitize to nothing or contain traversal are not
    /// recognised.
    pub fn locate(&self, value: &str) -> Option<Located> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if PrivateReference::is_reference(value) {
            return PrivateReference::parse(value)
                .ok()
                .map(|reference| Located::Private(reference.into_relative()));
        }

        let without_query = value.split(['?', '#']).next().unwrap_or(value);

        if let Some((_, suffix)) = without_query.split_once(self.private_url_prefix.as_str()) {
            return sanitize(suffix).ok().map(Located::Private);
        }

        let public_relative = self.public_relative(without_query)?;
        let source = public_relative
            .segments()
            .fold(self.public_root.clone(), |path, segment| path.join(segment));
        let relative = public_relative
            .strip_segment(&self.marker)
            .unwrap_or(public_relative);

        Some(Located::Public { source, relative })
    }

    /// The part of `value` relative to the public uploads root.
    fn public_relative(&self, value: &str) -> Option<RelativePath> {
        if !self.public_base_url.is_empty() {
            if let Some(rest) = strip_scheme(value)
                .strip_prefix(self.public_base_url.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                return sanitize(rest).ok();
            }
        }

        let root = self.public_root.to_string_lossy();
        let root = root.trim_end_matches('/');
        if !root.is_empty() {
            if let Some(rest) = value
                .strip_prefix(root)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                return sanitize(rest).ok();
            }
        }

        let captures = self.marker_pattern.captures(value)?;
        sanitize(&format!("{}/{}", self.marker, &captures["rest"])).ok()
    }
}

fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
}
