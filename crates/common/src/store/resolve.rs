use std::fs::{self, File};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{PrivateStore, StoreError};
use crate::path::{token_to_base64, RelativePath};

/// How deep the suffix fallback looks below the base directory: two
/// directory levels (`YYYY/MM`) plus the file itself.
pub const SUFFIX_SEARCH_DEPTH: usize = 3;

/// A file that passed every serving check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServableFile {
    /// Canonical absolute path, guaranteed to be inside the base directory.
    pub path: PathBuf,
    /// Path relative to the base directory, slash separated.
    pub relative: String,
    /// Base name sent back as the attachment file name.
    pub file_name: String,
    pub len: u64,
}

impl PrivateStore {
    /// Canonical base directory, or `StorageUnavailable` if it is missing.
    pub fn canonical_base(&self) -> Result<PathBuf, StoreError> {
        let base = fs::canonicalize(&self.base_dir).map_err(|source| {
            StoreError::StorageUnavailable {
                path: self.base_dir.clone(),
                source,
            }
        })?;
        if !base.is_dir() {
            return Err(StoreError::StorageUnavailable {
                path: self.base_dir.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        Ok(base)
    }

    /// Resolve a download suffix to a concrete file.
    ///
    /// First the suffix is mapped directly onto the base directory. If that
    /// does not name a servable file, its last segment is treated as a short
    /// token and files up to [`SUFFIX_SEARCH_DEPTH`] levels deep are scanned
    /// for a relative path (or file stem) ending with it.
    ///
    /// The scan visits entries in file-name order and returns the first hit.
    /// Two files sharing a token suffix are indistinguishable here; callers
    /// needing an exact file must use its full relative path.
    pub fn resolve_servable(&self, suffix: &RelativePath) -> Result<ServableFile, StoreError> {
        let base = self.canonical_base()?;

        let candidate = self.absolute_path(suffix);
        if let Some(found) = servable(&base, &candidate) {
            return Ok(found);
        }

        let token = suffix.file_name();
        let mut tokens = vec![token.to_string()];
        let substituted = token_to_base64(token);
        if substituted != token {
            tokens.push(substituted);
        }

        match suffix_match(&base, &tokens) {
            Some(found) => {
                tracing::debug!(token = %token, matched = %found.relative, "suffix match");
                Ok(found)
            }
            None => Err(StoreError::NotFound(suffix.to_string())),
        }
    }
}

fn suffix_match(base: &Path, tokens: &[String]) -> Option<ServableFile> {
    WalkDir::new(base)
        .min_depth(1)
        .max_depth(SUFFIX_SEARCH_DEPTH)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let relative = relative_string(base, entry.path());
            let stem = entry
                .path()
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            tokens
                .iter()
                .any(|token| relative.ends_with(token.as_str()) || stem.ends_with(token.as_str()))
        })
        .find_map(|entry| servable(base, entry.path()))
}

/// Accept `candidate` only if it canonicalizes to a readable regular file
/// strictly inside `base`.
fn servable(base: &Path, candidate: &Path) -> Option<ServableFile> {
    let real = fs::canonicalize(candidate).ok()?;
    if real == base || !real.starts_with(base) {
        return None;
    }
    let metadata = fs::metadata(&real).ok()?;
    if !metadata.is_file() {
        return None;
    }
    File::open(&real).ok()?;

    let file_name = real.file_name()?.to_string_lossy().into_owned();
    Some(ServableFile {
        relative: relative_string(base, &real),
        file_name,
        len: metadata.len(),
        path: real,
    })
}

fn relative_string(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
