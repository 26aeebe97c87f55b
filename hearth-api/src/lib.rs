use axum::{
    extract::{ConnectInfo, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod extract;
pub mod metrics;
pub mod routes;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.request_timeout))
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    let Some(redis) = state.redis.as_ref() else {
        return Ok(next.run(req).await);
    };

    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = format!("ratelimit:{}", ip);
    let limits = &state.rate_limit;

    match redis
        .check_rate_limit(&key, limits.requests_per_window, limits.window_seconds)
        .await
    {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")),
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, letting request through: {}", e);
            Ok(next.run(req).await)
        }
    }
}
