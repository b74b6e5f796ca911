use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session expired or credentials rejected")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request rejected ({status}): {body}")]
    Validation { status: u16, body: String },

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Request rejected by server (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Coarse classification used by callers and the notification layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailure,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    NetworkFailure,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::Server {
                status,
                body: truncated,
            },
            _ => ApiError::Validation {
                status,
                body: truncated,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized => ErrorKind::Unauthorized,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Server { .. } => ErrorKind::ServerError,
            ApiError::Timeout | ApiError::Network(_) => ErrorKind::NetworkFailure,
            ApiError::Validation { .. }
            | ApiError::Rejected { .. }
            | ApiError::InvalidResponse(_) => ErrorKind::ValidationFailure,
        }
    }

    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Validation { status, .. } | ApiError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Human-readable message for page-level display.
    ///
    /// Prefers `msg`/`message`/`error` from a JSON error body, then the raw
    /// body text, then a generic description of the failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Session expired, please log in again".to_string(),
            ApiError::Forbidden(body) => {
                message_from_body(body).unwrap_or_else(|| "Permission denied".to_string())
            }
            ApiError::NotFound(body) => {
                message_from_body(body).unwrap_or_else(|| "Resource not found".to_string())
            }
            ApiError::Validation { status, body } => message_from_body(body)
                .or_else(|| non_empty(body))
                .unwrap_or_else(|| format!("Request failed: {}", status)),
            ApiError::Server { status, body } => message_from_body(body)
                .or_else(|| non_empty(body))
                .unwrap_or_else(|| format!("Server error: {}", status)),
            ApiError::Rejected { message, code } => {
                non_empty(message).unwrap_or_else(|| format!("Request failed: code {}", code))
            }
            ApiError::Timeout => "Request timed out, check the network".to_string(),
            ApiError::Network(_) => "Request failed, check the network".to_string(),
            ApiError::InvalidResponse(detail) => format!("Unexpected server response: {}", detail),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Extract a message field from a JSON error body.
fn message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error"]
        .iter()
        .filter_map(|key| value.get(key).and_then(|v| v.as_str()))
        .find_map(non_empty)
}
