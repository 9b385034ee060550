use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Username and password required")]
    MissingCredentials,

    #[error("{0}")]
    VendorRejected(String),

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
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
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::HttpStatus {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    /// True when the error means the stored session can no longer be used.
    ///
    /// The vendor reports expired sessions as an ordinary rejection, so the
    /// only signal is its description text.
    pub fn is_session_error(&self) -> bool {
        match self {
            ApiError::Unauthenticated => true,
            ApiError::VendorRejected(desc) => desc.to_ascii_lowercase().contains("session"),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::NetworkFailure(err.to_string())
    }
}
