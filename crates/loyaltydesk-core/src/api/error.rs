use serde::Deserialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Message shown when a probe request is rejected with 401.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "The current user is not having the permission to make this action";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Access denied: {0}")]
    Authorization(String),

    #[error("Session expired - please log in again")]
    SessionExpired,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Server error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull the server-provided `message` out of a JSON error body.
    fn server_message(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    /// Classify a non-2xx response.
    ///
    /// `probe` is set when the request opted out of the unauthorized hook, in
    /// which case a 401 means "you lack permission" rather than "your session
    /// is dead".
    pub fn from_status(status: reqwest::StatusCode, body: &[u8], probe: bool) -> Self {
        let message = Self::server_message(body);
        match status.as_u16() {
            401 if !probe => ApiError::SessionExpired,
            401 | 403 => ApiError::Authorization(
                message.unwrap_or_else(|| PERMISSION_DENIED_MESSAGE.to_string()),
            ),
            code => {
                let message = message.unwrap_or_else(|| {
                    let text = String::from_utf8_lossy(body);
                    let text = text.trim();
                    if text.is_empty() {
                        format!(
                            "Request failed: {}",
                            status.canonical_reason().unwrap_or("unknown status")
                        )
                    } else {
                        Self::truncate_body(text)
                    }
                });
                ApiError::Remote {
                    status: code,
                    message,
                }
            }
        }
    }

    /// True when the server rejected the session token itself.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }
}
