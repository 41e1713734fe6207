//! HTTP API: router, rate-limit middleware, and the JSON envelope extractor.

pub mod challenge;
pub mod health;
pub mod payouts;
pub mod proof;
pub mod status;
pub mod withdraw;

use crate::error::ApiError;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequest, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/challenge", get(challenge::get_challenge))
        .route(
            "/submit-proof",
            post(proof::submit_proof).route_layer(middleware::from_fn_with_state(
                state.clone(),
                submit_rate_limit,
            )),
        )
        .route("/status", get(status::get_status))
        .route("/withdraw-request", post(withdraw::withdraw_request))
        .route("/payouts", get(payouts::list_payouts))
        .route("/health", get(health::get_health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            general_rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Json extractor whose rejection is the standard error envelope instead of
/// axum's default body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(_) => Err(ApiError::validation("Invalid request body")),
        }
    }
}

/// Client identity for rate limiting: first X-Forwarded-For hop when
/// present (browser traffic usually arrives through a proxy), else the
/// socket address.
fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn general_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    if state.general_limiter.check(&ip).is_err() {
        debug!(%ip, "general rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(req).await
}

async fn submit_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    if state.submit_limiter.check(&ip).is_err() {
        debug!(%ip, "submission rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(req).await
}
