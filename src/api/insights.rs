use crate::api::error::AppError;
use crate::api::AppState;
use crate::domain::AssetComparison;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub asset1: Option<String>,
    pub asset2: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(format!("Missing required query parameter: {}", name))
        })
}

/// GET /compare?asset1=BTC-USD&asset2=ETH-USD
pub async fn compare_assets(
    State(state): State<Arc<AppState>>,
    params: Result<Query<CompareParams>, QueryRejection>,
) -> Result<Json<AssetComparison>, AppError> {
    let Query(params) = params?;
    let asset1 = required(params.asset1, "asset1")?;
    let asset2 = required(params.asset2, "asset2")?;
    info!(asset1 = %asset1, asset2 = %asset2, "Comparing assets");
    Ok(Json(state.service.compare(&asset1, &asset2).await?))
}

/// GET /summary?symbol=TSLA
///
/// Generated prose over one symbol, or over the first tracked symbols when
/// no symbol is given.
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SummaryParams>, QueryRejection>,
) -> Result<Json<SummaryResponse>, AppError> {
    let Query(params) = params?;
    let summary = state.summary.summarize(params.symbol.as_deref()).await?;
    Ok(Json(SummaryResponse { summary }))
}
