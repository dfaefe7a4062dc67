//! Route handlers for the admission-control API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::ratelimit::{RateLimiter, RateLimitStatus};

/// Shared state for the route handlers.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
}

/// Build the service router.
///
/// `POST /agent/rate-limit/check` asks for admission; `DELETE` on the same
/// path clears the caller's throttling history.
pub fn router(limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route("/agent/rate-limit/check", post(check).delete(reset))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { limiter })
}

/// The message length may arrive in the JSON body or as a query parameter.
/// Deserialized as a float so that non-integer garbage is caught by the
/// validity check here rather than by a type-level rejection.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckParams {
    message_length: Option<f64>,
}

async fn check(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<CheckParams>,
    body: Option<Json<CheckParams>>,
) -> Response {
    let client_key = client_key(&headers, peer);

    let raw = body
        .and_then(|Json(params)| params.message_length)
        .or(query.message_length);

    let message_length = match raw {
        Some(value) if value.is_finite() && value >= 0.0 => value as usize,
        _ => {
            warn!(client = %client_key, value = ?raw, "Invalid message length");
            let body = Json(serde_json::json!({
                "allowed": false,
                "reason": "Invalid message length",
                "status": RateLimitStatus::zero(),
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }
    };

    let decision = state.limiter.check_now(&client_key, message_length);
    let code = if decision.is_allowed() {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };
    (code, Json(decision)).into_response()
}

async fn reset(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> StatusCode {
    let client_key = client_key(&headers, peer);
    state.limiter.reset(&client_key);
    StatusCode::NO_CONTENT
}

/// Derive the per-client key: the first `X-Forwarded-For` hop when the
/// header is present, otherwise the peer socket address.
fn client_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if !forwarded.trim().is_empty() {
            return normalize_ip(forwarded);
        }
    }
    normalize_ip(&peer.ip().to_string())
}

/// Reduce a raw address to a stable key: first hop of a comma-separated
/// list, IPv4-mapped prefix stripped, `"unknown"` when nothing is left.
fn normalize_ip(raw: &str) -> String {
    let first = raw.split(',').next().unwrap_or(raw);
    let cleaned = first.replace("::ffff:", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.to_string()
    }
}
