// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email OTP / magic-link sign-in against the hosted auth API.
//!
//! Handles:
//! - Sending one-time codes and magic links
//! - Exchanging codes (or callback fragments) for a session
//! - Token refresh before expiry, serialised per process
//! - Publishing [`SessionState`] to any number of observers

use crate::error::{AppError, AuthError, Result};
use crate::models::session::{resolve_expiry, AuthUser, TokenResponse};
use crate::models::{Session, SessionState};
use crate::services::supabase::SupabaseClient;
use crate::store::kv::{keys, KeyValueStore};
use chrono::{Duration, Utc};
use reqwest::Method;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use validator::ValidateEmail;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

#[derive(Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    email: &'a str,
    token: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Session provider shared by every screen.
///
/// Cloning is cheap; all clones observe the same session.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    client: SupabaseClient,
    redirect_url: String,
    kv: Arc<dyn KeyValueStore>,
    session: RwLock<Option<Session>>,
    state: watch::Sender<SessionState>,
    /// Serialises refreshes so concurrent callers don't burn the refresh token twice.
    refresh_lock: Mutex<()>,
}

impl AuthService {
    pub fn new(
        client: SupabaseClient,
        redirect_url: impl Into<String>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            inner: Arc::new(AuthInner {
                client,
                redirect_url: redirect_url.into(),
                kv,
                session: RwLock::new(None),
                state,
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    // ─── Observation ─────────────────────────────────────────────────────────

    /// Subscribe to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.inner.state.borrow().user_id().map(str::to_string)
    }

    /// Load a session persisted by a previous run.
    ///
    /// An unreadable persisted session is discarded; the user simply signs in again.
    pub async fn restore(&self) -> Option<String> {
        let raw = match self.inner.kv.get(keys::AUTH_SESSION).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Persisted session unreadable");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                let user_id = session.user_id.clone();
                self.install(session).await;
                tracing::info!(user_id = %user_id, "Session restored");
                Some(user_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding corrupt persisted session");
                let _ = self.inner.kv.remove(keys::AUTH_SESSION).await;
                None
            }
        }
    }

    // ─── Sign-in ─────────────────────────────────────────────────────────────

    /// Email a magic link that opens the app through the redirect scheme.
    pub async fn request_login_link(&self, email: &str) -> Result<()> {
        let email = normalize_email(email)?;
        let request = self
            .inner
            .client
            .auth(Method::POST, "otp", None)
            .query(&[("redirect_to", self.inner.redirect_url.as_str())])
            .json(&OtpRequest {
                email: &email,
                create_user: true,
            });
        self.inner.client.send_empty(request).await?;
        tracing::info!("Login link requested");
        Ok(())
    }

    /// Email a one-time code to type into the app.
    pub async fn request_otp(&self, email: &str) -> Result<()> {
        let email = normalize_email(email)?;
        let request = self
            .inner
            .client
            .auth(Method::POST, "otp", None)
            .json(&OtpRequest {
                email: &email,
                create_user: true,
            });
        self.inner.client.send_empty(request).await?;
        tracing::info!("One-time code requested");
        Ok(())
    }

    /// Exchange an emailed code for a session.
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<String> {
        let email = normalize_email(email)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::BadRequest("Enter the code from the email".to_string()));
        }

        let previous = self.inner.state.send_replace(SessionState::Authenticating);

        let request = self
            .inner
            .client
            .auth(Method::POST, "verify", None)
            .json(&VerifyRequest {
                kind: "email",
                email: &email,
                token: code,
            });

        match self
            .inner
            .client
            .send_json::<TokenResponse>(request)
            .await
            .map_err(map_auth_error)
        {
            Ok(tokens) => Ok(self.establish(tokens.into_session(Utc::now())).await),
            Err(e) => {
                tracing::info!(error = %e, "OTP verification failed");
                self.inner.state.send_replace(previous);
                Err(e)
            }
        }
    }

    /// Finish a magic-link sign-in from the callback URL the OS handed us.
    pub async fn complete_login_from_redirect(&self, callback_url: &str) -> Result<String> {
        if !callback_url.starts_with(&self.inner.redirect_url) {
            return Err(AppError::BadRequest(
                "Callback does not match the login redirect".to_string(),
            ));
        }

        let params = parse_callback_params(callback_url);
        if let Some(error) = params.get("error_code").or_else(|| params.get("error")) {
            tracing::info!(error = %error, "Magic link rejected");
            return Err(AuthError::InvalidCredential.into());
        }

        let access_token = params
            .get("access_token")
            .ok_or_else(|| AppError::BadRequest("Callback is missing access_token".to_string()))?;
        let refresh_token = params
            .get("refresh_token")
            .ok_or_else(|| AppError::BadRequest("Callback is missing refresh_token".to_string()))?;

        let expires_at = resolve_expiry(
            Utc::now(),
            params.get("expires_at").and_then(|v| v.parse::<i64>().ok()),
            params.get("expires_in").and_then(|v| v.parse::<i64>().ok()),
        );

        let previous = self.inner.state.send_replace(SessionState::Authenticating);

        let request = self
            .inner
            .client
            .auth(Method::GET, "user", Some(access_token.as_str()));
        let user = match self
            .inner
            .client
            .send_json::<AuthUser>(request)
            .await
            .map_err(map_auth_error)
        {
            Ok(user) => user,
            Err(e) => {
                self.inner.state.send_replace(previous);
                return Err(e);
            }
        };

        let session = Session {
            access_token: access_token.clone(),
            refresh_token: refresh_token.clone(),
            expires_at,
            user_id: user.id,
            email: user.email,
        };
        Ok(self.establish(session).await)
    }

    // ─── Tokens ──────────────────────────────────────────────────────────────

    /// A valid access token for the signed-in user, or `None` when signed out.
    ///
    /// Refreshes when the token is within five minutes of expiry. A rejected
    /// refresh signs the user out and yields [`AuthError::SessionExpired`].
    pub async fn access_token(&self) -> Result<Option<String>> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        match self.inner.session.read().await.as_ref() {
            None => return Ok(None),
            Some(s) if !s.expires_within(Utc::now(), margin) => {
                return Ok(Some(s.access_token.clone()))
            }
            Some(_) => {}
        }

        let _guard = self.inner.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        let session = match self.inner.session.read().await.clone() {
            None => return Ok(None),
            Some(s) => s,
        };
        if !session.expires_within(Utc::now(), margin) {
            return Ok(Some(session.access_token));
        }

        tracing::info!(user_id = %session.user_id, "Access token expiring, refreshing");
        let request = self
            .inner
            .client
            .auth(Method::POST, "token", None)
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest {
                refresh_token: &session.refresh_token,
            });

        match self
            .inner
            .client
            .send_json::<TokenResponse>(request)
            .await
            .map_err(map_auth_error)
        {
            Ok(tokens) => {
                let refreshed = tokens.into_session(Utc::now());
                let token = refreshed.access_token.clone();
                self.establish(refreshed).await;
                Ok(Some(token))
            }
            Err(e) if e.is_invalid_credential() => {
                tracing::warn!(user_id = %session.user_id, "Refresh token rejected, signing out");
                self.clear_local().await;
                Err(AuthError::SessionExpired.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Sign out locally, telling the server on a best-effort basis.
    pub async fn sign_out(&self) {
        let token = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = token {
            let request = self.inner.client.auth(Method::POST, "logout", Some(&token));
            if let Err(e) = self.inner.client.send_empty(request).await {
                tracing::warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }

        self.clear_local().await;
        tracing::info!("Signed out");
    }

    // ─── Internal ────────────────────────────────────────────────────────────

    async fn establish(&self, session: Session) -> String {
        match serde_json::to_string(&session) {
            Ok(text) => {
                if let Err(e) = self.inner.kv.set(keys::AUTH_SESSION, &text).await {
                    tracing::warn!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize session"),
        }

        let user_id = session.user_id.clone();
        self.install(session).await;
        tracing::info!(user_id = %user_id, "Signed in");
        user_id
    }

    async fn install(&self, session: Session) {
        let user_id = session.user_id.clone();
        *self.inner.session.write().await = Some(session);
        self.inner
            .state
            .send_replace(SessionState::Authenticated { user_id });
    }

    async fn clear_local(&self) {
        *self.inner.session.write().await = None;
        if let Err(e) = self.inner.kv.remove(keys::AUTH_SESSION).await {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
        self.inner.state.send_replace(SessionState::Unauthenticated);
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    if email.is_empty() || !email.validate_email() {
        return Err(AppError::BadRequest("Enter a valid email address".to_string()));
    }
    Ok(email.to_string())
}

/// Auth endpoints answer bad codes and dead refresh tokens with 4xx.
fn map_auth_error(e: AppError) -> AppError {
    match e {
        AppError::Server {
            status: 400 | 401 | 403 | 404 | 422,
            ..
        } => AuthError::InvalidCredential.into(),
        other => other,
    }
}

/// Key/value pairs from a callback URL's fragment, or its query if there is no fragment.
fn parse_callback_params(url: &str) -> HashMap<String, String> {
    let params = match url.split_once('#') {
        Some((_, fragment)) => fragment,
        None => url.split_once('?').map(|(_, q)| q).unwrap_or(""),
    };

    params
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter_map(|(k, v)| {
            let value = urlencoding::decode(&v.replace('+', " ")).ok()?.into_owned();
            Some((k.to_string(), value))
        })
        .collect()
}
