//! Storage seams. Each entity has exactly one writer, the repository behind
//! its trait; services only talk to these traits.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{AppConfig, StorageBackend};
use crate::db;
use crate::errors::StorageError;
use crate::models::{
    Booking, BookingStatus, Notification, NotificationStatus, Recipient, Review, ReviewContent,
    TimeSlot,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// What happened to the listed slot starting at a new booking's time.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotClaim {
    /// No slot is listed at that instant; the raw timestamp is booked.
    Unlisted,
    /// The slot was free and now belongs to the booking.
    Claimed(TimeSlot),
    /// The slot already belongs to another booking. Nothing was written.
    Taken,
}

pub trait BookingRepository: Send + Sync {
    /// Persists a booking together with its initial notifications and claims
    /// the listed slot at `booking.time_slot`, all or nothing.
    fn create_booking(&self, booking: &Booking, notifications: &[Notification]) -> Result<SlotClaim, StorageError>;

    fn get_booking(&self, id: &str) -> Result<Option<Booking>, StorageError>;

    /// All bookings in insertion order.
    fn list_bookings(&self) -> Result<Vec<Booking>, StorageError>;

    /// Moves a booking from `from` to `to`. Returns `None` when the booking
    /// does not exist or is no longer in `from`. Cancelling frees its slot.
    fn update_booking_status(
        &self,
        id: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, StorageError>;
}

pub trait NotificationRepository: Send + Sync {
    fn create_notification(&self, notification: &Notification) -> Result<(), StorageError>;

    /// Resolves every still-pending notification of `booking_id` addressed to
    /// `recipient`. Terminal rows are left alone. Returns the number updated.
    fn resolve_pending(
        &self,
        booking_id: &str,
        recipient: Recipient,
        status: NotificationStatus,
        at: DateTime<Utc>,
    ) -> Result<usize, StorageError>;

    fn list_notifications(&self, booking_id: &str) -> Result<Vec<Notification>, StorageError>;
}

pub trait ReviewRepository: Send + Sync {
    fn create_review(&self, review: &Review) -> Result<(), StorageError>;

    /// Stores an invitation placeholder and its pending notification together.
    fn create_invitation(&self, review: &Review, notification: &Notification) -> Result<(), StorageError>;

    fn get_review(&self, id: &str) -> Result<Option<Review>, StorageError>;

    fn get_review_by_token(&self, token: &str) -> Result<Option<Review>, StorageError>;

    /// Attaches content to the unsubmitted review holding `token`. Returns
    /// `None` when the token is unknown or was already redeemed.
    fn submit_review(
        &self,
        token: &str,
        content: &ReviewContent,
        is_published: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Review>, StorageError>;

    /// Every review, placeholders included, in creation order.
    fn list_reviews(&self) -> Result<Vec<Review>, StorageError>;

    /// Published, submitted reviews, newest submission first.
    fn list_published_reviews(&self, min_rating: Option<u8>) -> Result<Vec<Review>, StorageError>;

    fn set_published(&self, id: &str, is_published: bool) -> Result<bool, StorageError>;

    fn delete_review(&self, id: &str) -> Result<bool, StorageError>;
}

pub trait TimeSlotRepository: Send + Sync {
    /// Lists a new slot. Returns `false` when a slot already starts at the
    /// same instant.
    fn create_time_slot(&self, slot: &TimeSlot) -> Result<bool, StorageError>;

    /// Open slots starting at or after `from`, earliest first.
    fn list_available_slots(&self, from: DateTime<Utc>) -> Result<Vec<TimeSlot>, StorageError>;

    /// Every slot, earliest first.
    fn list_time_slots(&self) -> Result<Vec<TimeSlot>, StorageError>;
}

/// The repositories handed to request handlers.
#[derive(Clone)]
pub struct Repositories {
    pub bookings: Arc<dyn BookingRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub time_slots: Arc<dyn TimeSlotRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: BookingRepository + NotificationRepository + ReviewRepository + TimeSlotRepository + 'static,
    {
        Self {
            bookings: store.clone(),
            notifications: store.clone(),
            reviews: store.clone(),
            time_slots: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::default()))
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match config.storage_backend {
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                Ok(Self::in_memory())
            }
            StorageBackend::Sqlite => {
                tracing::info!(path = %config.database_url, "using sqlite storage");
                let conn = db::init_db(&config.database_url)?;
                Ok(Self::from_store(Arc::new(SqliteStore::new(conn))))
            }
        }
    }
}

/// Newest submission first; ties broken by id so the order is stable.
pub(crate) fn published_order(a: &Review, b: &Review) -> std::cmp::Ordering {
    b.submitted_at
        .cmp(&a.submitted_at)
        .then_with(|| a.id.cmp(&b.id))
}
