// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth session state and token payloads.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Observable authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated { user_id: String },
}

impl SessionState {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { user_id } => Some(user_id),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }
}

/// Signed-in session, persisted locally between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Session {
    /// Whether the access token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }
}

/// Lifetime assumed when a grant carries no usable expiry.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Expiry `secs` after `now`, or `None` if that is not a representable instant.
pub fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d))
}

/// Expiry for a grant: absolute timestamp if valid, else `expires_in` from
/// `now`, else the default lifetime.
pub fn resolve_expiry(
    now: DateTime<Utc>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
) -> DateTime<Utc> {
    expires_at
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .or_else(|| expires_in.and_then(|secs| expiry_after(now, secs)))
        .or_else(|| expiry_after(now, DEFAULT_TOKEN_LIFETIME_SECS))
        .unwrap_or(now)
}

/// Token grant returned by `/verify` and `/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Absolute expiry (Unix seconds), newer servers only
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl TokenResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = resolve_expiry(now, self.expires_at, Some(self.expires_in));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user_id: self.user.id,
            email: self.user.email,
        }
    }
}

/// User record embedded in token responses and returned by `/user`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}
