use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An appointment window the business offers. A booking whose `timeSlot`
/// equals `start_time` claims the slot until the booking is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_available: bool,
    pub booking_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(fields: NewTimeSlot) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_time: super::at_storage_precision(fields.start_time),
            end_time: super::at_storage_precision(fields.end_time),
            is_available: true,
            booking_id: None,
        }
    }

    pub fn claim(&mut self, booking_id: &str) {
        self.is_available = false;
        self.booking_id = Some(booking_id.to_string());
    }

    pub fn release(&mut self) {
        self.is_available = true;
        self.booking_id = None;
    }
}
