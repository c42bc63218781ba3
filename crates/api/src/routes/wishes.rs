//! Wish Routes

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::{error::ApiError, AppState};
use wishtree_storage::{Wish, DEFAULT_RECENT_LIMIT};

/// Longest accepted wish, in characters after trimming
pub const MAX_WISH_CHARS: usize = 200;

/// Upper bound for the `limit` query parameter
pub const MAX_RECENT_LIMIT: u32 = 100;

const WISH_ADDED_MESSAGE: &str = "Шарик добавлен на ёлку!";

/// Why a submitted wish text was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WishRejection {
    #[error("Текст пожелания не может быть пустым")]
    Empty,
    #[error("Пожелание слишком длинное (макс. 200 символов)")]
    TooLong,
}

impl WishRejection {
    fn reason(&self) -> &'static str {
        match self {
            WishRejection::Empty => "empty",
            WishRejection::TooLong => "too_long",
        }
    }
}

/// Trim `raw` and check it is a storable wish
pub fn validate_wish_text(raw: &str) -> Result<&str, WishRejection> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(WishRejection::Empty);
    }
    if text.chars().count() > MAX_WISH_CHARS {
        return Err(WishRejection::TooLong);
    }
    Ok(text)
}

/// Body of a new wish
#[derive(Debug, Deserialize)]
pub struct AddWishRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddWishResponse {
    pub success: bool,
    pub wish: Wish,
    pub message: String,
}

/// Add a wish
///
/// A body that is not valid JSON is treated like a wish without text.
pub async fn add_wish(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddWishRequest>, JsonRejection>,
) -> Result<Json<AddWishResponse>, ApiError> {
    let raw = match payload {
        Ok(Json(request)) => request.text.unwrap_or_default(),
        Err(rejection) => {
            debug!("Unreadable wish body: {}", rejection);
            String::new()
        }
    };

    let text = match validate_wish_text(&raw) {
        Ok(text) => text,
        Err(rejection) => {
            counter!("wishtree_wish_rejections_total", "reason" => rejection.reason())
                .increment(1);
            return Err(ApiError::Validation(rejection.to_string()));
        }
    };

    let wish = state.repository.add_wish(text).await?;
    counter!("wishtree_wishes_added_total").increment(1);
    info!("Wish {} added", wish.id);

    Ok(Json(AddWishResponse {
        success: true,
        wish,
        message: WISH_ADDED_MESSAGE.to_string(),
    }))
}

/// Query parameters for the recent wishes endpoint
///
/// `limit` is kept as raw text so that a non-numeric value falls back to the
/// default instead of failing the request.
#[derive(Debug, Default)]
pub struct RecentQuery {
    pub limit: Option<String>,
}

impl RecentQuery {
    /// Build from raw query pairs; the first `limit` wins
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let limit = pairs
            .into_iter()
            .find(|(key, _)| key == "limit")
            .map(|(_, value)| value);
        Self { limit }
    }

    /// Effective limit, clamped to `0..=MAX_RECENT_LIMIT`
    pub fn limit(&self) -> u32 {
        match self.limit.as_deref().and_then(|raw| raw.trim().parse::<i64>().ok()) {
            Some(limit) => limit.clamp(0, i64::from(MAX_RECENT_LIMIT)) as u32,
            None => DEFAULT_RECENT_LIMIT,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecentWishesResponse {
    pub success: bool,
    pub wishes: Vec<Wish>,
    pub count: usize,
}

/// Get the most recent visible wishes
pub async fn get_recent(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<RecentWishesResponse>, ApiError> {
    let params = RecentQuery::from_pairs(pairs);
    let wishes = state.repository.get_recent_wishes(params.limit()).await?;

    Ok(Json(RecentWishesResponse {
        success: true,
        count: wishes.len(),
        wishes,
    }))
}
