use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::auth::AdminAuth;
use super::{into_object, AppJson, AppQuery};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Notification, Review, ReviewState, TimeSlot};
use crate::services::reviews::Invitation;
use crate::services::{bookings, notifications, reviews, time_slots};
use crate::state::AppState;

// GET /api/admin/bookings
pub async fn list_bookings(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(bookings::list_bookings(&state.store)?))
}

// GET /api/admin/bookings/:id
pub async fn get_booking(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(bookings::get_booking(&state.store, &id)?))
}

// GET /api/admin/bookings/:id/notifications
pub async fn booking_notifications(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(notifications::list_for_booking(&state.store, &id)?))
}

// POST /api/admin/bookings/:id/confirm
pub async fn confirm_booking(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(bookings::transition_booking(&state.store, &id, BookingStatus::Confirmed)?))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(bookings::transition_booking(&state.store, &id, BookingStatus::Cancelled)?))
}

// POST /api/admin/bookings/:id/review-invitation
pub async fn invite_review(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Invitation>), AppError> {
    let invitation = reviews::invite_review(&state, &id).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

// GET /api/admin/reviews?state=unsubmitted|submitted|published
#[derive(Deserialize)]
pub struct ReviewListQuery {
    pub state: Option<ReviewState>,
}

pub async fn list_reviews(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<ReviewListQuery>,
) -> Result<Json<Vec<Review>>, AppError> {
    Ok(Json(reviews::list_reviews(&state.store, query.state)?))
}

// POST /api/admin/reviews
pub async fn create_review(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Value>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = reviews::create_review(&state.store, &into_object(body))?;
    Ok((StatusCode::CREATED, Json(review)))
}

// PUT /api/admin/reviews/:id/publish
pub async fn publish_review(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(body): AppJson<Value>,
) -> Result<Json<Review>, AppError> {
    Ok(Json(reviews::update_publish_status(&state.store, &id, &into_object(body))?))
}

// DELETE /api/admin/reviews/:id
pub async fn delete_review(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    reviews::delete_review(&state.store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/admin/time-slots
pub async fn list_time_slots(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    Ok(Json(time_slots::list_time_slots(&state.store)?))
}

// POST /api/admin/time-slots
pub async fn create_time_slot(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<Value>,
) -> Result<(StatusCode, Json<TimeSlot>), AppError> {
    let slot = time_slots::create_time_slot(&state.store, &into_object(body))?;
    Ok((StatusCode::CREATED, Json(slot)))
}
