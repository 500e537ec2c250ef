use crate::refresh::AssetRefreshService;
use crate::summary::SummaryGenerator;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod assets;
mod error;
mod ingest;
mod insights;

/// Shared by every handler through axum's `State` extractor.
pub struct AppState {
    pub service: Arc<AssetRefreshService>,
    pub summary: Arc<SummaryGenerator>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/assets", get(assets::list_assets).post(assets::add_assets))
        .route("/assets/{symbol}/history", get(assets::get_history))
        .route("/metrics/{symbol}", get(assets::get_metrics))
        .route("/compare", get(insights::compare_assets))
        .route("/summary", get(insights::get_summary))
        .route("/ingest", post(ingest::ingest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
