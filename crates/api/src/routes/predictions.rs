//! Prediction Routes

use axum::{extract::State, Json};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;

use crate::{error::ApiError, AppState};
use wishtree_storage::Prediction;

/// Response for the random prediction endpoint
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: Prediction,
}

/// Get a random prediction
pub async fn get_random(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let prediction = state
        .repository
        .get_random_prediction()
        .await?
        .ok_or_else(|| ApiError::NotFound("No predictions found".to_string()))?;

    counter!("wishtree_predictions_served_total").increment(1);

    Ok(Json(PredictionResponse {
        success: true,
        prediction,
    }))
}
