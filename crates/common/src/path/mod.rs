//! Relative paths inside the private store.
//!
//! A [`RelativePath`] can only be obtained through [`sanitize`], so holding
//! one means the value is slash-separated, has no leading slash, no empty or
//! `.` segments and no `..` segment in either its percent-decoded or its
//! base64url-substituted form.

mod sanitize;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use sanitize::{percent_decode_fully, sanitize, token_to_base64, SanitizeError};

/// A validated, normalized path relative to the private base directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the slash-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The last segment, used as the display name of a file.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Everything but the last segment, if there is more than one.
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }

    /// Strip a leading segment, returning the remainder as a new path.
    ///
    /// `fluentform/2026/02/a.pdf` with prefix `fluentform` yields
    /// `2026/02/a.pdf`. Returns `None` if the prefix does not match a whole
    /// segment or nothing would remain.
    pub fn strip_segment(&self, segment: &str) -> Option<RelativePath> {
        let rest = self.0.strip_prefix(segment)?.strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }
        Some(RelativePath(rest.to_string()))
    }

    /// The same directory with the file name's stem suffixed by `-{n}`.
    ///
    /// `2026/02/cv.pdf` numbered 1 is `2026/02/cv-1.pdf`; a name with no
    /// extension gets the suffix at the end.
    pub fn numbered(&self, n: usize) -> RelativePath {
        let name = self.file_name();
        let renamed = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, n, ext),
            _ => format!("{}-{}", name, n),
        };
        match self.parent() {
            Some(parent) => RelativePath(format!("{}/{}", parent, renamed)),
            None => RelativePath(renamed),
        }
    }

    // Callers guarantee `value` was produced by joining sanitized segments.
    pub(crate) fn from_sanitized(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RelativePath {
    type Error = SanitizeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        sanitize(&value)
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = SanitizeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        sanitize(value)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_and_parent() {
        let path = sanitize("2026/02/report.pdf").unwrap();
        assert_eq!(path.file_name(), "report.pdf");
        assert_eq!(path.parent(), Some("2026/02"));

        let bare = sanitize("report.pdf").unwrap();
        assert_eq!(bare.file_name(), "report.pdf");
        assert_eq!(bare.parent(), None);
    }

    #[test]
    fn test_numbered() {
        let path = sanitize("2026/02/cv.pdf").unwrap();
        assert_eq!(path.numbered(1).as_str(), "2026/02/cv-1.pdf");
        assert_eq!(path.numbered(12).as_str(), "2026/02/cv-12.pdf");
        assert_eq!(sanitize("notes").unwrap().numbered(2).as_str(), "notes-2");
        assert_eq!(sanitize("a/.env").unwrap().numbered(1).as_str(), "a/.env-1");
        assert_eq!(
            sanitize("a/archive.tar.gz").unwrap().numbered(1).as_str(),
            "a/archive.tar-1.gz"
        );
    }

    #[test]
    fn test_strip_segment() {
        let path = sanitize("fluentform/2026/02/a.pdf").unwrap();
        assert_eq!(
            path.strip_segment("fluentform").unwrap().as_str(),
            "2026/02/a.pdf"
        );
        // Partial segment matches are not stripped
        assert!(path.strip_segment("fluent").is_none());
        assert!(sanitize("fluentform").unwrap().strip_segment("fluentform").is_none());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: RelativePath = serde_json::from_str(r#""/2026/02/a.pdf""#).unwrap();
        assert_eq!(ok.as_str(), "2026/02/a.pdf");

        let bad: Result<RelativePath, _> = serde_json::from_str(r#""2026/../../etc/passwd""#);
        assert!(bad.is_err());
    }
}
