// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Low-level client for the hosted backend (REST table API, auth and
//! object storage).
//!
//! Handles:
//! - `apikey` / bearer headers on every request
//! - Mapping transport and HTTP failures onto [`AppError`]
//! - JSON decoding of responses

use crate::config::Config;
use crate::error::{AppError, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Backend HTTP client.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, anon_key)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        Self::with_http(http, &config.supabase_url, &config.supabase_anon_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request against the table API, e.g. `rest("sources")`.
    pub fn rest(&self, method: Method, table: &str, bearer: Option<&str>) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{}", table), bearer)
    }

    /// Request against the auth API, e.g. `auth("otp")`.
    pub fn auth(&self, method: Method, endpoint: &str, bearer: Option<&str>) -> RequestBuilder {
        self.request(method, &format!("/auth/v1/{}", endpoint), bearer)
    }

    /// Request against object storage, e.g. `storage("object/<bucket>/<path>")`.
    pub fn storage(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        self.request(method, &format!("/storage/v1/{}", path), bearer)
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    /// Send a request and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = send(request).await?;
        let response = check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("JSON parse error: {}", e)))
    }

    /// Send a request and only check its status.
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        let response = send(request).await?;
        check_response(response).await?;
        Ok(())
    }
}

async fn send(request: RequestBuilder) -> Result<Response> {
    request
        .send()
        .await
        .map_err(|e| AppError::Network(e.to_string()))
}

/// Check response status and return error if not successful.
pub(crate) async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Backend rate limit hit (429)");
    }

    Err(AppError::Server {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or_else(|| format!("HTTP {}", status)),
    })
}

/// Pull a human-readable message out of an error body.
///
/// The REST, auth and storage APIs each use a different field name.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(str::to_string)
}
