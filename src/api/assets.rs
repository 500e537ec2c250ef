use crate::api::error::AppError;
use crate::api::AppState;
use crate::domain::{Asset, AssetView, HistoryEntry};
use crate::refresh::{RefreshError, DEFAULT_HISTORY_LIMIT};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetsResponse {
    pub assets: Vec<AssetView>,
}

#[derive(Debug, Deserialize)]
pub struct AddAssetsRequest {
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

/// GET /assets
///
/// Every tracked symbol with its latest metrics; symbols without data yet
/// carry nulls.
pub async fn list_assets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AssetsResponse>, AppError> {
    let assets = state.service.tracked_assets()?;
    info!(count = assets.len(), "Retrieved assets");
    Ok(Json(AssetsResponse { assets }))
}

/// POST /assets
///
/// Starts tracking the given symbols and fetches their metrics.
pub async fn add_assets(
    State(state): State<Arc<AppState>>,
    request: Result<Json<AddAssetsRequest>, JsonRejection>,
) -> Result<Json<AssetsResponse>, AppError> {
    let Json(request) = request?;
    if request.symbols.iter().all(|s| s.trim().is_empty()) {
        return Err(AppError::bad_request(
            "No symbols provided. Please provide at least one symbol.",
        ));
    }
    let result = match state.service.refresh(&request.symbols).await {
        Ok(result) => result,
        Err(RefreshError::NoValidData { .. }) => {
            return Err(AppError::bad_request(concat!(
                "No valid symbols provided. ",
                "Symbols should be in format 'BTC-USD' for crypto or 'TSLA' for stocks."
            )))
        }
        Err(e) => return Err(e.into()),
    };
    let assets = state
        .service
        .views(&request.symbols)?
        .into_iter()
        .map(|view| {
            if result.updated_assets.contains(&view.symbol) {
                view
            } else {
                AssetView::empty(view.symbol)
            }
        })
        .collect();
    info!(added = ?result.updated_assets, "Added new assets");
    Ok(Json(AssetsResponse { assets }))
}

/// GET /assets/{symbol}/history?limit=N
///
/// Stored snapshots, newest first.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let history = state.service.history(&symbol, limit)?;
    if history.is_empty() {
        return Err(AppError::not_found(format!(
            "No history found for symbol {}",
            symbol
        )));
    }
    Ok(Json(HistoryResponse { history }))
}

/// GET /metrics/{symbol}
///
/// Refreshes the symbol and returns what was stored.
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<Asset>, AppError> {
    match state.service.refresh_one(&symbol).await {
        Ok(asset) => Ok(Json(asset)),
        Err(RefreshError::NotFound(_)) => {
            Err(AppError::not_found(format!("Symbol {} not found", symbol)))
        }
        Err(e) => Err(e.into()),
    }
}
