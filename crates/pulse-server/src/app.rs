use crate::api::{dashboard, update, value};
use crate::logging;
use crate::state::AppState;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

/// Routes plus middleware. Request logging sits inside the gzip layers so it
/// sees plain bodies in both directions.
pub fn build_http_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/ping", get(dashboard::ping))
        .route("/update", post(update::update_json))
        .route("/update/{kind}/{id}/{value}", post(update::update_path))
        .route("/updates", post(update::update_batch))
        .route("/value", post(value::value_json))
        .route("/value/{kind}/{id}", get(value::value_path))
        .with_state(state)
        .layer(middleware::from_fn(logging::request_logging))
        .layer(CompressionLayer::new())
        .layer(RequestDecompressionLayer::new())
}
