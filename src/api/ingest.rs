use crate::api::error::AppError;
use crate::api::AppState;
use crate::refresh::RefreshError;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub assets: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub updated_count: usize,
    pub success_messages: Vec<String>,
    pub error_messages: Vec<String>,
    pub updated_assets: Vec<String>,
}

fn parse_request(body: &[u8]) -> Result<IngestRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IngestRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e)))
}

/// POST /ingest
///
/// Refreshes the listed assets, or every tracked symbol when the body is
/// missing or lists none. Unknown symbols that resolve are tracked from now on.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let request = parse_request(&body)?;
    let symbols = match request.assets {
        Some(assets) if !assets.is_empty() => assets,
        _ => state.service.store().list_tracked_symbols().map_err(RefreshError::from)?,
    };
    let result = state.service.refresh(&symbols).await?;
    if result.updated_assets.is_empty() {
        return Err(AppError::bad_request(
            "No valid data could be fetched for any symbol",
        ));
    }
    Ok(Json(IngestResponse {
        message: format!("Processed {} symbols", symbols.len()),
        updated_count: result.updated_count,
        success_messages: result.success_messages,
        error_messages: result.error_messages,
        updated_assets: result.updated_assets,
    }))
}
