//! Admission checks for protected downloads.
//!
//! [`DownloadGate::admit`] runs every check a download request must pass and
//! hands back the file to stream. The order is fixed: authorization, path
//! sanitization, link proof, then resolution. A request that fails an early
//! check never touches the filesystem.

use serde::Deserialize;
use time::OffsetDateTime;

use crate::auth::Session;
use crate::link::{LinkError, LinkSigner, DOWNLOAD_ACTION};
use crate::path::{sanitize, SanitizeError};
use crate::store::{PrivateStore, ServableFile, StoreError};

/// Log target for security-relevant rejections.
pub const SECURITY_TARGET: &str = "privy::security";

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("administrator session required")]
    Unauthorized,
    #[error("invalid path: {0}")]
    PathInvalid(#[from] SanitizeError),
    #[error("link proof does not match the requested path")]
    LinkTampered,
    #[error("link expired")]
    LinkExpired,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Query parameters of a download request, exactly as received.
///
/// Every field is kept as a string so that malformed values are judged by
/// the gate, after authorization, rather than by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub proof: String,
}

#[derive(Debug, Clone)]
pub struct DownloadGate {
    store: PrivateStore,
    signer: LinkSigner,
}

impl DownloadGate {
    pub fn new(store: PrivateStore, signer: LinkSigner) -> Self {
        Self { store, signer }
    }

    pub fn store(&self) -> &PrivateStore {
        &self.store
    }

    pub fn admit(
        &self,
        session: Option<&Session>,
        request: &DownloadRequest,
        now: OffsetDateTime,
    ) -> Result<ServableFile, GateError> {
        match session {
            Some(session) if session.is_administrator() => {}
            Some(session) => {
                tracing::info!(subject = %session.subject, "download denied, not an administrator");
                return Err(GateError::Unauthorized);
            }
            None => {
                tracing::info!("download denied, no session");
                return Err(GateError::Unauthorized);
            }
        }

        let relative = sanitize(&request.path)?;

        let verified = if request.action != DOWNLOAD_ACTION {
            Err(LinkError::Tampered)
        } else {
            request
                .expires
                .trim()
                .parse::<i64>()
                .map_err(|_| LinkError::Tampered)
                .and_then(|expires| {
                    self.signer
                        .verify(&request.action, &relative, expires, &request.proof, now)
                })
        };
        match verified {
            Ok(()) => {}
            Err(LinkError::Expired) => {
                tracing::info!(path = %relative, "download denied, link expired");
                return Err(GateError::LinkExpired);
            }
            Err(e) => {
                tracing::warn!(
                    target: SECURITY_TARGET,
                    path = %relative,
                    action = %request.action,
                    reason = %e,
                    "download link failed verification"
                );
                return Err(GateError::LinkTampered);
            }
        }

        self.store.resolve_servable(&relative).map_err(|e| match e {
            StoreError::NotFound(path) => GateError::NotFound(path),
            StoreError::PathInvalid(e) => GateError::PathInvalid(e),
            other => {
                tracing::error!(error = %other, "private storage unavailable");
                GateError::StorageUnavailable(other.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::auth::Role;
    use crate::link::LinkKey;

    fn setup() -> (TempDir, DownloadGate) {
        let temp = TempDir::new().unwrap();
        let store = PrivateStore::new(temp.path().join("private"));
        store.ensure_base_dir().unwrap();
        let signer = LinkSigner::new(LinkKey::from([3; 32]), Duration::from_secs(600));
        (temp, DownloadGate::new(store, signer))
    }

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_770_000_000).unwrap()
    }

    fn admin() -> Session {
        Session::new("ops", Role::Administrator)
    }

    fn put(gate: &DownloadGate, relative: &str) {
        let path = gate.store().absolute_path(&sanitize(relative).unwrap());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"content").unwrap();
    }

    fn request(gate: &DownloadGate, path: &str) -> DownloadRequest {
        let link = gate.signer.mint(&sanitize(path).unwrap(), now());
        DownloadRequest {
            action: link.action,
            path: link.path.to_string(),
            expires: link.expires.to_string(),
            proof: link.proof,
        }
    }

    #[test]
    fn test_admits_valid_request() {
        let (_temp, gate) = setup();
        put(&gate, "2026/02/report.pdf");

        let file = gate
            .admit(Some(&admin()), &request(&gate, "2026/02/report.pdf"), now())
            .unwrap();
        assert_eq!(file.file_name, "report.pdf");
        assert_eq!(file.len, 7);
    }

    #[test]
    fn test_unauthorized_before_anything_else() {
        let (_temp, gate) = setup();
        put(&gate, "2026/02/report.pdf");
        let valid = request(&gate, "2026/02/report.pdf");
        let member = Session::new("jane", Role::Member);

        assert!(matches!(
            gate.admit(None, &valid, now()),
            Err(GateError::Unauthorized)
        ));
        assert!(matches!(
            gate.admit(Some(&member), &valid, now()),
            Err(GateError::Unauthorized)
        ));

        let hostile = DownloadRequest {
            path: "../../etc/passwd".into(),
            ..Default::default()
        };
        assert!(matches!(
            gate.admit(None, &hostile, now()),
            Err(GateError::Unauthorized)
        ));
    }

    #[test]
    fn test_invalid_path() {
        let (_temp, gate) = setup();
        let mut req = request(&gate, "2026/02/report.pdf");
        req.path = "2026/%2e%2e/%2e%2e/secret".into();

        assert!(matches!(
            gate.admit(Some(&admin()), &req, now()),
            Err(GateError::PathInvalid(SanitizeError::Traversal))
        ));
    }

    #[test]
    fn test_substituted_path_is_tampered() {
        let (_temp, gate) = setup();
        put(&gate, "2026/02/salaries.xlsx");
        let mut req = request(&gate, "2026/02/report.pdf");
        req.path = "2026/02/salaries.xlsx".into();

        assert!(matches!(
            gate.admit(Some(&admin()), &req, now()),
            Err(GateError::LinkTampered)
        ));
    }

    #[test]
    fn test_wrong_action_or_garbage_expiry_is_tampered() {
        let (_temp, gate) = setup();
        let mut req = request(&gate, "2026/02/report.pdf");
        req.action = "privy_delete".into();
        assert!(matches!(
            gate.admit(Some(&admin()), &req, now()),
            Err(GateError::LinkTampered)
        ));

        let mut req = request(&gate, "2026/02/report.pdf");
        req.expires = "tomorrow".into();
        assert!(matches!(
            gate.admit(Some(&admin()), &req, now()),
            Err(GateError::LinkTampered)
        ));
    }

    #[test]
    fn test_expired() {
        let (_temp, gate) = setup();
        put(&gate, "2026/02/report.pdf");
        let req = request(&gate, "2026/02/report.pdf");
        let later = now() + time::Duration::hours(1);

        assert!(matches!(
            gate.admit(Some(&admin()), &req, later),
            Err(GateError::LinkExpired)
        ));
    }

    #[test]
    fn test_not_found() {
        let (_temp, gate) = setup();
        assert!(matches!(
            gate.admit(Some(&admin()), &request(&gate, "2099/99/ghost.pdf"), now()),
            Err(GateError::NotFound(_))
        ));
    }

    #[test]
    fn test_storage_unavailable() {
        let (temp, gate) = setup();
        let req = request(&gate, "2026/02/report.pdf");
        fs::remove_dir_all(temp.path().join("private")).unwrap();

        assert!(matches!(
            gate.admit(Some(&admin()), &req, now()),
            Err(GateError::StorageUnavailable(_))
        ));
    }

    #[test]
    fn test_token_form_link() {
        let (_temp, gate) = setup();
        put(&gate, "2026/02/upload-Ab+c");

        let file = gate
            .admit(Some(&admin()), &request(&gate, "fluentform/Ab-c"), now())
            .unwrap();
        assert_eq!(file.relative, "2026/02/upload-Ab+c");
    }
}
