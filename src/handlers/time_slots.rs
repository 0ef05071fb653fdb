use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::AppQuery;
use crate::errors::AppError;
use crate::models::TimeSlot;
use crate::services::time_slots;
use crate::state::AppState;

// GET /api/time-slots
#[derive(Deserialize)]
pub struct SlotQuery {
    pub date: Option<String>,
}

pub async fn list_available(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<SlotQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    Ok(Json(time_slots::available_slots(&state.store, query.date.as_deref())?))
}
