// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fake of the hosted backend and the weather API.
//!
//! Serves the table, auth and storage endpoints the client uses, records every
//! request, and lets tests inject failures.

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use flowie_core::config::Config;
use flowie_core::models::{Origin, Spot, SpotStatus};
use flowie_core::services::{AuthService, SpotGateway, SupabaseClient, WeatherClient};
use flowie_core::store::{KeyValueStore, MemoryKeyValueStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ANON_KEY: &str = "test_anon_key";
pub const VALID_OTP: &str = "123456";
pub const USER_ID: &str = "0b6c1b9e-user";
pub const BUCKET: &str = "spots-images";

/// A request as the fake server saw it.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: String,
}

#[allow(dead_code)]
impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        parse_query(&self.query)
    }
}

/// Shared fake backend state.
#[derive(Default)]
pub struct FakeBackend {
    pub rows: Mutex<Vec<Spot>>,
    pub requests: Mutex<Vec<Recorded>>,
    /// Return every row, ignoring filters
    pub ignore_filters: AtomicBool,
    pub fail_storage: AtomicBool,
    pub fail_insert: AtomicBool,
    /// Non-zero makes the sources endpoints answer with this status
    pub rest_status: AtomicU16,
    /// Non-zero makes the forecast endpoint answer with this status
    pub weather_status: AtomicU16,
    pub weather_code: AtomicI64,
    pub refresh_count: AtomicUsize,
    /// Lifetime of issued access tokens, in seconds
    pub expires_in: AtomicI64,
    pub reject_refresh: AtomicBool,
    token_counter: AtomicUsize,
    valid_refresh: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn requests_to(&self, path_prefix: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .cloned()
            .collect()
    }

    fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: &str) {
        self.requests.lock().unwrap().push(Recorded {
            method: method.clone(),
            path: uri.path().to_string(),
            query: uri.query().unwrap_or("").to_string(),
            headers: headers.clone(),
            body: body.to_string(),
        });
    }

    fn issue_tokens(&self) -> Value {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let refresh = format!("refresh-{}", n);
        *self.valid_refresh.lock().unwrap() = Some(refresh.clone());
        let expires_in = match self.expires_in.load(Ordering::SeqCst) {
            0 => 3600,
            secs => secs,
        };
        json!({
            "access_token": format!("access-{}", n),
            "token_type": "bearer",
            "expires_in": expires_in,
            "refresh_token": refresh,
            "user": { "id": USER_ID, "email": "walker@example.com" }
        })
    }
}

/// Running fake server.
#[allow(dead_code)]
pub struct TestServer {
    pub base_url: String,
    pub backend: Arc<FakeBackend>,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn start() -> Self {
        let backend = Arc::new(FakeBackend::default());
        let app = Router::new()
            .route("/rest/v1/sources", get(select_sources).post(insert_source))
            .route("/storage/v1/object/{*path}", post(upload_object))
            .route("/auth/v1/otp", post(otp))
            .route("/auth/v1/verify", post(verify))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/user", get(user))
            .route("/auth/v1/logout", post(logout))
            .route("/v1/forecast", get(forecast))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            base_url: format!("http://{}", addr),
            backend,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            supabase_url: self.base_url.clone(),
            supabase_anon_key: ANON_KEY.to_string(),
            weather_api_url: self.base_url.clone(),
            ..Config::default()
        }
    }

    pub fn client(&self) -> SupabaseClient {
        SupabaseClient::new(&self.base_url, ANON_KEY)
    }

    pub fn auth(&self, kv: Arc<dyn KeyValueStore>) -> AuthService {
        AuthService::new(self.client(), "flowie://login", kv)
    }

    /// Gateway plus the auth service it reads tokens from.
    pub fn gateway(&self) -> (SpotGateway, AuthService) {
        let auth = self.auth(Arc::new(MemoryKeyValueStore::new()));
        (SpotGateway::new(self.client(), auth.clone(), BUCKET), auth)
    }

    pub fn weather_client(&self) -> WeatherClient {
        WeatherClient::new(reqwest::Client::new(), &self.base_url)
    }

    pub fn seed(&self, spots: Vec<Spot>) {
        self.backend.rows.lock().unwrap().extend(spots);
    }
}

/// A verified spot at the given position.
#[allow(dead_code)]
pub fn spot(id: &str, lat: f64, lng: f64) -> Spot {
    Spot {
        id: id.to_string(),
        origin: Origin::Verified,
        external_id: Some(format!("ext-{}", id)),
        type_label: "outdoor_water_fountain".to_string(),
        lat,
        lng,
        status: SpotStatus::Active,
        created_by: None,
        created_at: None,
        wheelchair_access: None,
        dog_bowl: None,
        image_path: None,
        address: Some(format!("Street {}", id)),
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            let v = urlencoding::decode(v).map(|c| c.into_owned()).unwrap_or_default();
            (k.to_string(), v)
        })
        .collect()
}

fn matches_filter(spot: &Spot, column: &str, expr: &str) -> bool {
    let Some((op, value)) = expr.split_once('.') else {
        return true;
    };
    let numeric = |v: f64| {
        let target: f64 = value.parse().unwrap_or(f64::NAN);
        match op {
            "gte" => v >= target,
            "lte" => v <= target,
            _ => true,
        }
    };
    match column {
        "lat" => numeric(spot.lat),
        "lng" => numeric(spot.lng),
        "id" => spot.id == value,
        "origin" => spot.origin.as_str() == value,
        "created_by" => spot.created_by.as_deref() == Some(value),
        _ => true,
    }
}

fn status_override(code: u16) -> Option<Response> {
    if code == 0 {
        return None;
    }
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Some((status, Json(json!({ "message": "injected failure" }))).into_response())
}

async fn select_sources(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    backend.record(&method, &uri, &headers, "");
    if let Some(resp) = status_override(backend.rest_status.load(Ordering::SeqCst)) {
        return resp;
    }

    let pairs = parse_query(query.as_deref().unwrap_or(""));
    let mut rows: Vec<Spot> = backend.rows.lock().unwrap().clone();

    if !backend.ignore_filters.load(Ordering::SeqCst) {
        for (column, expr) in &pairs {
            rows.retain(|s| matches_filter(s, column, expr));
        }
        if pairs.iter().any(|(k, v)| k == "order" && v == "created_at.desc") {
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        if let Some(limit) = pairs
            .iter()
            .find(|(k, _)| k == "limit")
            .and_then(|(_, v)| v.parse::<usize>().ok())
        {
            rows.truncate(limit);
        }
    }

    Json(rows).into_response()
}

async fn insert_source(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    backend.record(&method, &uri, &headers, &body);
    if backend.fail_insert.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "insert failed" })),
        )
            .into_response();
    }

    let mut row: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let id = format!("new-{}", backend.rows.lock().unwrap().len() + 1);
    row["id"] = json!(id);
    row["created_at"] = json!("2026-05-01T12:00:00+00:00");

    match serde_json::from_value::<Spot>(row) {
        Ok(spot) => {
            backend.rows.lock().unwrap().push(spot.clone());
            (StatusCode::CREATED, Json(vec![spot])).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": e.to_string() })),
        )
            .into_response(),
    }
}

async fn upload_object(
    State(backend): State<Arc<FakeBackend>>,
    Path(path): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    backend.record(&method, &uri, &headers, &format!("<{} bytes>", body.len()));
    if backend.fail_storage.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "statusCode": "403", "error": "Unauthorized", "message": "new row violates row-level security policy" })),
        )
            .into_response();
    }
    Json(json!({ "Key": path })).into_response()
}

async fn otp(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    backend.record(&method, &uri, &headers, &body);
    Json(json!({})).into_response()
}

async fn verify(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    backend.record(&method, &uri, &headers, &body);
    let request: Value = serde_json::from_str(&body).unwrap_or_default();
    if request["token"] == VALID_OTP {
        Json(backend.issue_tokens()).into_response()
    } else {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "code": 403, "error_code": "otp_expired", "msg": "Token has expired or is invalid" })),
        )
            .into_response()
    }
}

async fn token(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    backend.record(&method, &uri, &headers, &body);
    backend.refresh_count.fetch_add(1, Ordering::SeqCst);

    let request: Value = serde_json::from_str(&body).unwrap_or_default();
    let presented = request["refresh_token"].as_str().map(str::to_string);
    let valid = backend.valid_refresh.lock().unwrap().clone();

    if backend.reject_refresh.load(Ordering::SeqCst) || presented.is_none() || presented != valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token: Already Used" })),
        )
            .into_response();
    }
    Json(backend.issue_tokens()).into_response()
}

async fn user(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.record(&method, &uri, &headers, "");
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if bearer == format!("Bearer {}", ANON_KEY) || !bearer.starts_with("Bearer ") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "msg": "invalid JWT" })),
        )
            .into_response();
    }
    Json(json!({ "id": USER_ID, "email": "walker@example.com" })).into_response()
}

async fn logout(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.record(&method, &uri, &headers, "");
    StatusCode::NO_CONTENT.into_response()
}

async fn forecast(
    State(backend): State<Arc<FakeBackend>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.record(&method, &uri, &headers, "");
    if let Some(resp) = status_override(backend.weather_status.load(Ordering::SeqCst)) {
        return resp;
    }
    Json(json!({
        "latitude": 48.2,
        "longitude": 16.37,
        "current_weather": {
            "temperature": 21.7,
            "windspeed": 3.4,
            "winddirection": 240,
            "weathercode": backend.weather_code.load(Ordering::SeqCst),
            "is_day": 1,
            "time": "2026-05-01T12:00"
        }
    }))
    .into_response()
}
