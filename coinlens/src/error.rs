//! Error types for the client core
//!
//! Uses thiserror for ergonomic error definitions.
//! Every failure ends up as local view state, nothing here panics.

use thiserror::Error;

/// Custom Result type using our Error
pub type Result<T> = std::result::Result<T, LensError>;

/// Message shown for failures the user cannot fix by editing a form.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Client core errors
#[derive(Error, Debug)]
pub enum LensError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad credentials or no valid session
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Client-side form checks, raised before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure (DNS, connection, CORS, aborted body)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the API
    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The owning view went away before the fetch finished
    #[error("Request cancelled")]
    Cancelled,

    /// Resource missing from an otherwise successful response
    #[error("Not found: {0}")]
    NotFound(String),
}

impl LensError {
    /// Text suitable for an inline error banner.
    ///
    /// Auth and validation messages are written for end users already; the
    /// rest collapse to a generic retry hint.
    pub fn user_message(&self) -> String {
        match self {
            LensError::Auth(msg) | LensError::Validation(msg) => msg.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            LensError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LensError::Cancelled)
    }
}

impl From<reqwest::Error> for LensError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => LensError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => LensError::Network(err.to_string()),
        }
    }
}

impl From<futures::future::Aborted> for LensError {
    fn from(_: futures::future::Aborted) -> Self {
        LensError::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LensError::Api { status: 502, message: "bad gateway".into() };
        assert_eq!(err.to_string(), "API error: HTTP 502: bad gateway");
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_user_message() {
        let auth = LensError::Auth("Invalid credentials".into());
        assert_eq!(auth.user_message(), "Invalid credentials");

        let net = LensError::Network("connection refused".into());
        assert_eq!(net.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: LensError = json_err.into();
        assert!(matches!(err, LensError::Json(_)));

        let err: LensError = futures::future::Aborted.into();
        assert!(err.is_cancelled());
    }
}
