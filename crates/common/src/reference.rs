use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::path::{sanitize, RelativePath, SanitizeError};

/// Scheme tagging a value as already relocated into the private store.
pub const REFERENCE_SCHEME: &str = "ff-private";

const SCHEME_SEPARATOR: &str = "://";

/// A tagged `ff-private://<RelativePath>` value.
///
/// Distinguishes "already points into the private store" from a legacy
/// public URL or path that still needs relocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrivateReference {
    relative: RelativePath,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("value is not an ff-private:// reference")]
    NotAReference,
    #[error("invalid reference path: {0}")]
    InvalidPath(#[from] SanitizeError),
}

impl PrivateReference {
    pub fn new(relative: RelativePath) -> Self {
        Self { relative }
    }

    pub fn relative(&self) -> &RelativePath {
        &self.relative
    }

    pub fn into_relative(self) -> RelativePath {
        self.relative
    }

    /// Cheap check used by the rewriter to skip values it already produced.
    pub fn is_reference(value: &str) -> bool {
        value
            .trim()
            .strip_prefix(REFERENCE_SCHEME)
            .is_some_and(|rest| rest.starts_with(SCHEME_SEPARATOR))
    }

    pub fn parse(value: &str) -> Result<Self, ReferenceError> {
        let rest = value
            .trim()
            .strip_prefix(REFERENCE_SCHEME)
            .and_then(|rest| rest.strip_prefix(SCHEME_SEPARATOR))
            .ok_or(ReferenceError::NotAReference)?;
        Ok(Self::new(sanitize(rest)?))
    }
}

impl fmt::Display for PrivateReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", REFERENCE_SCHEME, SCHEME_SEPARATOR, self.relative)
    }
}

impl FromStr for PrivateReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PrivateReference {
    type Error = ReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PrivateReference> for String {
    fn from(reference: PrivateReference) -> Self {
        reference.to_string()
    }
}
