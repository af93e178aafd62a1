use super::RelativePath;

/// Upper bound on the decoded path length.
pub const MAX_PATH_LENGTH: usize = 4096;

/// Percent-decoding is repeated until the value is stable, at most this many times.
const MAX_DECODE_ROUNDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("path is empty")]
    Empty,
    #[error("path contains a parent directory segment")]
    Traversal,
    #[error("path contains a null byte")]
    NullByte,
    #[error("path exceeds the maximum length of 4096 bytes")]
    TooLong,
    #[error("path is not valid UTF-8 once decoded")]
    InvalidEncoding,
    #[error("path is still percent-encoded after repeated decoding")]
    ExcessiveEncoding,
}

/// Percent-decode until the value no longer changes.
///
/// Double-encoded traversal (`%252e%252e`) decodes to `..` and is then
/// rejected by [`sanitize`] like any other `..` segment.
pub fn percent_decode_fully(raw: &str) -> Result<String, SanitizeError> {
    let mut current = raw.to_string();
    for _ in 0..MAX_DECODE_ROUNDS {
        let decoded = urlencoding::decode(&current)
            .map_err(|_| SanitizeError::InvalidEncoding)?
            .into_owned();
        if decoded == current {
            return Ok(current);
        }
        current = decoded;
    }
    Err(SanitizeError::ExcessiveEncoding)
}

/// Map URL-safe base64 characters back to the standard alphabet (`-`→`+`, `_`→`/`).
pub fn token_to_base64(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect()
}

fn has_parent_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// Validate and normalize a caller-supplied relative path.
///
/// The input is fully percent-decoded first. Backslashes become slashes,
/// leading slashes, empty segments and `.` segments are dropped. Any `..`
/// segment, in the decoded form or in the base64url-substituted form, makes
/// the whole path invalid; a partial path is never returned.
pub fn sanitize(raw: &str) -> Result<RelativePath, SanitizeError> {
    let decoded = percent_decode_fully(raw)?;

    if decoded.contains('\0') {
        return Err(SanitizeError::NullByte);
    }
    if decoded.len() > MAX_PATH_LENGTH {
        return Err(SanitizeError::TooLong);
    }

    let normalized = decoded.replace('\\', "/");
    if has_parent_segment(&normalized) || has_parent_segment(&token_to_base64(&normalized)) {
        return Err(SanitizeError::Traversal);
    }

    let segments: Vec<&str> = normalized
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if segments.is_empty() {
        return Err(SanitizeError::Empty);
    }

    Ok(RelativePath::from_sanitized(segments.join("/")))
}
