//! Router assembly: JSON API, static SPA, Basic-Auth gate, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod auth;
pub mod http;

/// Build the application router with:
/// - JSON API under `/api/...` (unknown API paths get a plain 404, never the SPA)
/// - Static SPA from `static_dir` with index fallback for client-side routes
/// - Basic-Auth on everything, API and static files alike
/// - CORS (allow any origin/method/headers) and per-request trace spans
pub fn build_router(state: Arc<AppState>, static_dir: &str, password: &str) -> Router {
    let index = format!("{}/index.html", static_dir.trim_end_matches('/'));
    let static_service = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(index));

    let api = Router::new()
        .route("/problems", get(http::http_list_problems))
        .route("/problems/:id", get(http::http_get_problem))
        .route("/topics", get(http::http_list_topics))
        .route("/grade", post(http::http_post_grade))
        .route("/smoke", get(http::http_smoke))
        .fallback(http::http_api_not_found);

    let password: Arc<str> = Arc::from(password);

    Router::new()
        .nest("/api", api)
        .fallback_service(static_service)
        .with_state(state)
        .layer(middleware::from_fn_with_state(password, auth::require_basic_auth))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
