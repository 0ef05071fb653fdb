use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use super::{into_object, AppJson};
use crate::errors::AppError;
use crate::models::Booking;
use crate::services::bookings;
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Value>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = bookings::submit_booking(&state, &into_object(body)).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}
