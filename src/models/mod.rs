pub mod booking;
pub mod notification;
pub mod review;
pub mod time_slot;

use chrono::{DateTime, SubsecRound, Utc};

pub use booking::{Booking, BookingStatus, NewBooking};
pub use notification::{Notification, NotificationChannel, NotificationStatus, Recipient};
pub use review::{Review, ReviewContent, ReviewState};
pub use time_slot::{NewTimeSlot, TimeSlot};

/// Timestamps are kept at microsecond precision, the resolution they are
/// stored with.
pub fn at_storage_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(6)
}

pub fn now() -> DateTime<Utc> {
    at_storage_precision(Utc::now())
}
