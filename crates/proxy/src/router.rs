use crate::NowPlayingService;
use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use now_listening_core::urls::NOW_PLAYING_PATH;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /api/now-playing` plus `GET /health`.
///
/// Cross-origin GETs are allowed so a local dev server can poll a deployed
/// proxy by absolute origin.
pub fn router(service: Arc<NowPlayingService>) -> Router {
    Router::new()
        .route(NOW_PLAYING_PATH, get(now_playing))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn now_playing(State(service): State<Arc<NowPlayingService>>) -> Response {
    service.http_response().await.into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
