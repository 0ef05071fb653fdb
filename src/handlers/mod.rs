pub mod admin;
pub mod auth;
pub mod bookings;
pub mod health;
pub mod reviews;
pub mod time_slots;

use axum::extract::{FromRequest, FromRequestParts};
use serde_json::{Map, Value};

use crate::errors::AppError;

/// `Json` whose rejection is an [`AppError`], so unreadable bodies get the
/// same `{error, fields}` shape as validation failures.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` with an [`AppError`] rejection.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Request bodies are validated field by field; anything that is not a JSON
/// object is treated as an object with no fields.
pub(crate) fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
