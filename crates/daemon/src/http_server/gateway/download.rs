use axum::body::Body;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use http::{header, HeaderValue, StatusCode};
use time::OffsetDateTime;
use tokio_util::io::ReaderStream;

use common::gate::{DownloadRequest, GateError};
use common::store::ServableFile;

use crate::auth::SESSION_COOKIE;
use crate::ServiceState;

/// Read size used while streaming a file (1 MiB).
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Serve a protected download link.
///
/// The credential comes from a bearer token or the session cookie. The gate
/// decides; this handler only streams what it admits.
#[tracing::instrument(skip_all, fields(path = %request.path))]
pub async fn handler(
    State(state): State<ServiceState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    Query(request): Query<DownloadRequest>,
) -> Result<Response, DownloadError> {
    let credential = bearer
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
        .or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()));
    let session = state.authorizer().session(credential.as_deref());

    let gate_state = state.clone();
    let file = tokio::task::spawn_blocking(move || {
        gate_state
            .gate()
            .admit(session.as_ref(), &request, OffsetDateTime::now_utc())
    })
    .await
    .map_err(|e| DownloadError::Internal(e.to_string()))??;

    tracing::info!(file = %file.relative, size = file.len, "serving private download");
    stream_file(file).await
}

async fn stream_file(file: ServableFile) -> Result<Response, DownloadError> {
    let handle = tokio::fs::File::open(&file.path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DownloadError::Gate(GateError::NotFound(file.relative.clone()))
        } else {
            DownloadError::Internal(e.to_string())
        }
    })?;

    let mime = mime_guess::from_path(&file.file_name).first_or_octet_stream();
    let encoded = urlencoding::encode(&file.file_name);
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        encoded, encoded
    ))
    .map_err(|e| DownloadError::Internal(e.to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, file.len)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(header::CACHE_CONTROL, "private, no-store")
        .header("Content-Description", "File Transfer")
        .body(Body::from_stream(ReaderStream::with_capacity(handle, CHUNK_SIZE)))
        .map_err(|e| DownloadError::Internal(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("download failed: {0}")]
    Internal(String),
}

impl IntoResponse for DownloadError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DownloadError::Gate(GateError::Unauthorized) => (StatusCode::FORBIDDEN, "forbidden"),
            DownloadError::Gate(GateError::LinkTampered) => (StatusCode::FORBIDDEN, "forbidden"),
            DownloadError::Gate(GateError::LinkExpired) => (StatusCode::FORBIDDEN, "link expired"),
            DownloadError::Gate(GateError::PathInvalid(_)) => (StatusCode::BAD_REQUEST, "invalid path"),
            DownloadError::Gate(GateError::NotFound(_)) => (StatusCode::NOT_FOUND, "not found"),
            DownloadError::Gate(GateError::StorageUnavailable(_)) | DownloadError::Internal(_) => {
                tracing::error!("DOWNLOAD ERROR: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "download failed")
            }
        };
        (
            status,
            [(header::CONTENT_TYPE, "text/plain")],
            message,
        )
            .into_response()
    }
}
