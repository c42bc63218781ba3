//! Stats Routes

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{error::ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub total_wishes: u64,
}

/// Get the number of visible wishes
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let total_wishes = state.repository.get_wish_count().await?;

    Ok(Json(StatsResponse {
        success: true,
        total_wishes,
    }))
}
