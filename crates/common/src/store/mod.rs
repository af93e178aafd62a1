//! The private store.
//!
//! [`PrivateStore`] owns a single base directory outside the public web root.
//! Every managed file lives at `base_dir + RelativePath`, and nothing else in
//! the system writes under that directory.

mod resolve;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::path::{sanitize, RelativePath, SanitizeError};
use crate::reference::PrivateReference;

pub use resolve::{ServableFile, SUFFIX_SEARCH_DEPTH};

/// Numbered names tried before a relocation gives up.
const MAX_NAME_ATTEMPTS: usize = 1000;

const COMPARE_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("private base directory {path} is unavailable: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no servable file for {0}")]
    NotFound(String),
    #[error("invalid path: {0}")]
    PathInvalid(#[from] SanitizeError),
    #[error("source file {0} does not exist")]
    SourceMissing(PathBuf),
    #[error("failed to relocate {from} to {to}: {source}")]
    RelocationFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a file ended up in the private store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationOutcome {
    /// Linked into place and the public copy removed.
    Moved,
    /// Linking failed (e.g. cross-device) and copy-then-delete was used.
    Copied,
    /// The store already holds this upload; nothing was written.
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub reference: PrivateReference,
    pub outcome: RelocationOutcome,
}

/// Where freshly uploaded files should land instead of the public uploads dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// Absolute directory the upload is written to.
    pub path: PathBuf,
    /// The private base directory.
    pub basedir: PathBuf,
    /// URL recorded for the upload's directory; never a real public URL.
    pub url: String,
    /// URL standing in for the base directory.
    pub baseurl: String,
    /// The date-bucket subdirectory, with a leading slash, or empty.
    pub subdir: String,
}

#[derive(Debug, Clone)]
pub struct PrivateStore {
    base_dir: PathBuf,
}

impl PrivateStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create the base directory and its parents if missing.
    ///
    /// Safe to call concurrently; an existing directory is success.
    pub fn ensure_base_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir).map_err(|source| StoreError::StorageUnavailable {
            path: self.base_dir.clone(),
            source,
        })
    }

    /// Whether the base directory currently exists as a directory.
    pub fn is_available(&self) -> bool {
        self.base_dir.is_dir()
    }

    /// Absolute location of `relative` inside the store.
    pub fn absolute_path(&self, relative: &RelativePath) -> PathBuf {
        relative
            .segments()
            .fold(self.base_dir.clone(), |path, segment| path.join(segment))
    }

    /// Move `source` into the store at `relative`.
    ///
    /// An existing file in the store is never replaced. If `relative` is
    /// taken by a file with different content, the upload lands at the first
    /// free numbered name (`cv-1.pdf`, `cv-2.pdf`, ...) and the returned
    /// reference points there. A destination already holding the same
    /// content counts as done, so reprocessing and racing submissions are
    /// harmless.
    ///
    /// Files are placed with a hard link when source and store share a
    /// filesystem, otherwise by copying into a newly created file.
    pub fn relocate(
        &self,
        source: &Path,
        relative: &RelativePath,
    ) -> Result<Relocation, StoreError> {
        let mut upload = match File::open(source) {
            Ok(file) if source.is_file() => file,
            Ok(_) => return Err(StoreError::SourceMissing(source.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.absolute_path(relative).is_file() {
                    tracing::debug!(path = %relative, "already relocated");
                    return Ok(Relocation {
                        reference: PrivateReference::new(relative.clone()),
                        outcome: RelocationOutcome::AlreadyPresent,
                    });
                }
                return Err(StoreError::SourceMissing(source.to_path_buf()));
            }
            Err(e) => {
                return Err(StoreError::RelocationFailed {
                    from: source.to_path_buf(),
                    to: self.absolute_path(relative),
                    source: e,
                })
            }
        };

        let failed = |to: PathBuf, e: io::Error| StoreError::RelocationFailed {
            from: source.to_path_buf(),
            to,
            source: e,
        };

        let first = self.absolute_path(relative);
        if let Some(parent) = first.parent() {
            fs::create_dir_all(parent).map_err(|e| failed(first.clone(), e))?;
        }

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                relative.clone()
            } else {
                relative.numbered(attempt)
            };
            let destination = self.absolute_path(&candidate);

            match place(source, &mut upload, &destination) {
                Ok(outcome) => {
                    remove_source(source);
                    tracing::info!(
                        from = %source.display(),
                        to = %candidate,
                        outcome = ?outcome,
                        "relocated upload"
                    );
                    return Ok(Relocation {
                        reference: PrivateReference::new(candidate),
                        outcome,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if same_content(&mut upload, &destination)
                        .map_err(|e| failed(destination.clone(), e))?
                    {
                        remove_source(source);
                        tracing::debug!(path = %candidate, "already relocated");
                        return Ok(Relocation {
                            reference: PrivateReference::new(candidate),
                            outcome: RelocationOutcome::AlreadyPresent,
                        });
                    }
                    tracing::debug!(path = %candidate, "name taken by another upload");
                }
                Err(e) => return Err(failed(destination, e)),
            }
        }

        Err(failed(
            first,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free name after {} attempts", MAX_NAME_ATTEMPTS),
            ),
        ))
    }

    /// Prepare the private directory for a fresh upload.
    ///
    /// `subdir` is the date bucket the upload subsystem would have used
    /// (`/2026/02`), `private_base_url` the fake URL standing in for the base
    /// directory.
    pub fn upload_target(
        &self,
        subdir: &str,
        private_base_url: &str,
    ) -> Result<UploadTarget, StoreError> {
        let baseurl = private_base_url.trim_end_matches('/').to_string();
        let relative = if subdir.trim_matches('/').is_empty() {
            None
        } else {
            Some(sanitize(subdir)?)
        };

        let (path, url, subdir) = match &relative {
            Some(relative) => (
                self.absolute_path(relative),
                format!("{}/{}", baseurl, relative),
                format!("/{}", relative),
            ),
            None => (self.base_dir.clone(), baseurl.clone(), String::new()),
        };

        fs::create_dir_all(&path).map_err(|source| StoreError::StorageUnavailable {
            path: path.clone(),
            source,
        })?;

        Ok(UploadTarget {
            path,
            basedir: self.base_dir.clone(),
            url,
            baseurl,
            subdir,
        })
    }
}

/// Put the upload at `destination` without replacing anything there.
///
/// Fails with `AlreadyExists` if `destination` is taken.
fn place(source: &Path, upload: &mut File, destination: &Path) -> io::Result<RelocationOutcome> {
    match fs::hard_link(source, destination) {
        Ok(()) => return Ok(RelocationOutcome::Moved),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(e),
        // Cross-device, unsupported, or the source was unlinked by a
        // concurrent relocation: copy from the handle we already hold
        Err(_) => {}
    }

    let mut placed = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;
    let copied = upload
        .seek(SeekFrom::Start(0))
        .and_then(|_| io::copy(upload, &mut placed))
        .and_then(|_| placed.sync_all());
    if let Err(e) = copied {
        drop(placed);
        let _ = fs::remove_file(destination);
        return Err(e);
    }
    Ok(RelocationOutcome::Copied)
}

/// Whether `existing` is a regular file with exactly the upload's bytes.
fn same_content(upload: &mut File, existing: &Path) -> io::Result<bool> {
    let metadata = match fs::metadata(existing) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if !metadata.is_file() || metadata.len() != upload.metadata()?.len() {
        return Ok(false);
    }

    upload.seek(SeekFrom::Start(0))?;
    let mut existing = File::open(existing)?;
    let mut ours = vec![0; COMPARE_CHUNK_SIZE];
    let mut theirs = vec![0; COMPARE_CHUNK_SIZE];
    loop {
        let read = fill(upload, &mut ours)?;
        if read != fill(&mut existing, &mut theirs)? || ours[..read] != theirs[..read] {
            return Ok(false);
        }
        if read == 0 {
            return Ok(true);
        }
    }
}

fn fill(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn remove_source(source: &Path) {
    match fs::remove_file(source) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %source.display(),
            error = %e,
            "relocated upload but could not remove the public copy"
        ),
    }
}
