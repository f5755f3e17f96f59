use anyhow::Context;
use axum::{
    Router,
    extract::{Request, State},
    http::HeaderValue,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use governor::{Quota, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::config::Config;
use crate::state::SharedState;

mod error;
mod regions;
mod system;
mod trends;

pub use error::ApiError;

/// Per-client fixed-window rate limiter keyed by caller address.
pub type ApiRateLimiter =
    governor::RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Request id minted (or forwarded) by the middleware; every handler and
/// error body carries it.
#[derive(Debug, Clone, Default)]
pub struct RequestId(pub String);

#[derive(Clone)]
pub struct AppState {
    pub shared: SharedState,

    pub limiter: Arc<ApiRateLimiter>,
}

pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = SharedState::new(config).await?;
    build_app_state(shared)
}

/// Assembles the API state around an already-wired [`SharedState`].
pub fn build_app_state(shared: SharedState) -> anyhow::Result<Arc<AppState>> {
    let rate_limit = &shared.config.rate_limit;

    let burst = NonZeroU32::new(rate_limit.max_requests)
        .context("Rate limit size must be positive")?;
    let period = Duration::from_millis(
        (rate_limit.window_ms / u64::from(rate_limit.max_requests)).max(1),
    );
    let quota = Quota::with_period(period)
        .context("Rate limit window must be positive")?
        .allow_burst(burst);

    Ok(Arc::new(AppState {
        shared,
        limiter: Arc::new(ApiRateLimiter::keyed(quota)),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.shared.config.server.cors_allowed_origins.clone();

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/v1/trends/query", post(trends::query_trends))
        .route("/v1/regions", get(regions::list_regions))
        .route("/health", get(system::health))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Attaches a request id (honoring `X-Request-ID`) and wraps the request in
/// a tracing span so every log line downstream carries the id.
async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let mut response = next.run(req).await;

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        info!(status = response.status().as_u16(), "{method} {path}");
        response
    }
    .instrument(span)
    .await
}

/// Fixed-window rate limiting per client address. Runs inside the
/// request-id layer so 429 bodies carry the id.
async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req);

    if state.limiter.check_key(&key).is_err() {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_default();
        return ApiError::rate_limited(&request_id.0).into_response();
    }

    next.run(req).await
}

fn client_key(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn not_found(request_id: Option<axum::Extension<RequestId>>) -> ApiError {
    let request_id = request_id.map(|ext| ext.0.0).unwrap_or_default();
    ApiError::not_found("The requested resource was not found", &request_id)
}
