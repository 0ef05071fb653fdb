use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::{self, TimeSlot};
use crate::repository::Repositories;
use crate::validation;

/// Lists a new appointment window. Two slots never share a start time.
pub fn create_time_slot(store: &Repositories, payload: &Map<String, Value>) -> Result<TimeSlot, AppError> {
    let slot = TimeSlot::new(validation::validate_time_slot(payload)?);
    if !store.time_slots.create_time_slot(&slot)? {
        return Err(AppError::Conflict(format!(
            "a time slot already starts at {}",
            slot.start_time.to_rfc3339()
        )));
    }
    tracing::info!(slot_id = %slot.id, start = %slot.start_time, end = %slot.end_time, "time slot listed");
    Ok(slot)
}

/// Open slots from the start of `date` (or now) onward.
pub fn available_slots(store: &Repositories, date: Option<&str>) -> Result<Vec<TimeSlot>, AppError> {
    let from = validation::validate_slot_date(date, models::now())?;
    Ok(store.time_slots.list_available_slots(from)?)
}

pub fn list_time_slots(store: &Repositories) -> Result<Vec<TimeSlot>, AppError> {
    Ok(store.time_slots.list_time_slots()?)
}
