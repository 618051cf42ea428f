use super::super::ApiState;
use crate::types::*;
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;

pub async fn health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, StatusCode> {
    match state.database.health_check().await {
        Ok(_) => Ok(Json(HealthResponse {
            status: "ok",
            timestamp: Utc::now(),
        })),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

pub async fn get_processing_status(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ChainBlockStatus>>, StatusCode> {
    match state.database.get_block_statuses().await {
        Ok(blocks) => Ok(Json(blocks)),
        Err(e) => {
            tracing::error!("Failed to get processing status: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
