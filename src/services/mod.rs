pub mod bookings;
pub mod email;
pub mod notifications;
pub mod reviews;
pub mod time_slots;
pub mod token;
