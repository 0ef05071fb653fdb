use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{into_object, AppJson, AppQuery};
use crate::errors::AppError;
use crate::models::Review;
use crate::services::reviews;
use crate::state::AppState;
use crate::validation;

// POST /api/reviews
#[derive(Serialize)]
pub struct SubmitResponse {
    success: bool,
    review: Review,
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Value>,
) -> Result<Json<SubmitResponse>, AppError> {
    let review = reviews::submit_review(&state, &into_object(body))?;
    Ok(Json(SubmitResponse { success: true, review }))
}

// GET /api/reviews/token/:token
pub async fn get_review_by_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<Review>, AppError> {
    Ok(Json(reviews::get_review_by_token(&state.store, &token)?))
}

// GET /api/reviews
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedQuery {
    pub min_rating: Option<String>,
}

pub async fn list_published(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<PublishedQuery>,
) -> Result<Json<Vec<Review>>, AppError> {
    let min_rating = validation::validate_min_rating(query.min_rating.as_deref())?;
    Ok(Json(reviews::get_published_reviews(&state.store, min_rating)?))
}
