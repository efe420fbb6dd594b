//! HTTP request handlers

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::error::{Result, ServerError};
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<String>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.adapter.candidate_id(),
        "uptime_secs": (chrono::Utc::now() - state.started_at).num_seconds(),
    }))
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let adapter = &state.adapter;
    Json(json!({
        "candidate_id": adapter.candidate_id(),
        "feature_names": adapter.feature_names(),
        "labels": adapter.label_map().names(),
    }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let rows = request.features.len();

    let adapter = state.adapter.clone();
    let predictions = tokio::task::spawn_blocking(move || adapter.predict_labels(&request.features))
        .await
        .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;

    debug!(rows, "predict request served");
    Ok(Json(PredictResponse { predictions }))
}
