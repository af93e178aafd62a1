use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("daemon not reachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("bad API address: {0}")]
    Address(#[from] url::ParseError),
    /// The daemon refused the request as sent, e.g. a traversal path.
    #[error("rejected by daemon ({0}): {1}")]
    Rejected(StatusCode, String),
    /// The daemon failed on its side, e.g. private storage unavailable.
    #[error("daemon failed ({0}): {1}")]
    Daemon(StatusCode, String),
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status.is_client_error() {
            ApiError::Rejected(status, body)
        } else {
            ApiError::Daemon(status, body)
        }
    }
}
