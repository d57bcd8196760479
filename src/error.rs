// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing messages.

/// Authentication failures surfaced inline on the sign-in screen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid or expired code")]
    InvalidCredential,

    #[error("Session expired")]
    SessionExpired,

    #[error("Not signed in")]
    NotSignedIn,
}

/// Application error type.
///
/// None of these are fatal: callers keep whatever state they already display
/// and show [`AppError::user_message`] as a transient notice.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Sensor not available on this device")]
    SensorUnavailable,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::Server { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this is a rejected one-time code or magic link.
    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, AppError::Auth(AuthError::InvalidCredential))
    }

    /// Short, dismissible text for a toast or inline message.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => "No connection. Showing the last loaded spots.".to_string(),
            AppError::Server { status, .. } if *status >= 500 => {
                "The server is having trouble. Try again shortly.".to_string()
            }
            AppError::Server { status: 429, .. } => {
                "Too many requests. Try again shortly.".to_string()
            }
            AppError::Server { message, .. } => format!("Request failed: {}", message),
            AppError::Auth(AuthError::InvalidCredential) => {
                "That code is invalid or has expired. Request a new one.".to_string()
            }
            AppError::Auth(AuthError::SessionExpired) => {
                "Your session expired. Please sign in again.".to_string()
            }
            AppError::Auth(AuthError::NotSignedIn) => "Sign in to continue.".to_string(),
            AppError::PermissionDenied(what) => format!("Permission needed: {}", what),
            AppError::SensorUnavailable => "Step counting is not available.".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Storage(_) | AppError::Parse(_) | AppError::Internal(_) => {
                "Something went wrong.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::Parse(e.to_string())
        } else {
            AppError::Network(e.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::Network("reset".into()).is_transient());
        assert!(AppError::Server {
            status: 503,
            message: "down".into()
        }
        .is_transient());
        assert!(AppError::Server {
            status: 429,
            message: "slow down".into()
        }
        .is_transient());
        assert!(!AppError::Server {
            status: 400,
            message: "bad".into()
        }
        .is_transient());
        assert!(!AppError::Auth(AuthError::InvalidCredential).is_transient());
    }

    #[test]
    fn test_invalid_credential_detection() {
        assert!(AppError::from(AuthError::InvalidCredential).is_invalid_credential());
        assert!(!AppError::from(AuthError::SessionExpired).is_invalid_credential());
        assert!(!AppError::BadRequest("x".into()).is_invalid_credential());
    }

    #[test]
    fn test_user_message_never_leaks_internal_detail() {
        let err = AppError::Storage("/home/user/.flowie/saved_spots.json: EACCES".into());
        assert_eq!(err.user_message(), "Something went wrong.");
    }
}
