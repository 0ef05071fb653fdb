use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{
    published_order, BookingRepository, NotificationRepository, ReviewRepository, SlotClaim,
    TimeSlotRepository,
};
use crate::errors::StorageError;
use crate::models::{
    Booking, BookingStatus, Notification, NotificationStatus, Recipient, Review, ReviewContent,
    TimeSlot,
};

#[derive(Default)]
struct Tables {
    bookings: Vec<Booking>,
    notifications: Vec<Notification>,
    reviews: Vec<Review>,
    time_slots: Vec<TimeSlot>,
}

impl Tables {
    fn has_booking(&self, id: &str) -> bool {
        self.bookings.iter().any(|b| b.id == id)
    }

    fn check_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        if self.has_booking(&notification.booking_id) {
            return Ok(());
        }
        Err(StorageError::Corrupt(format!(
            "notification references unknown booking {}",
            notification.booking_id
        )))
    }

    fn check_review(&self, review: &Review) -> Result<(), StorageError> {
        if self.reviews.iter().any(|r| r.review_token == review.review_token) {
            return Err(StorageError::Corrupt("duplicate review token".to_string()));
        }
        Ok(())
    }
}

/// Process-local store used by tests and `STORAGE_BACKEND=memory`.
/// One lock guards all tables, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl BookingRepository for MemoryStore {
    fn create_booking(&self, booking: &Booking, notifications: &[Notification]) -> Result<SlotClaim, StorageError> {
        let mut tables = self.lock()?;
        if tables.has_booking(&booking.id) {
            return Err(StorageError::Corrupt(format!("duplicate booking id {}", booking.id)));
        }
        if let Some(n) = notifications.iter().find(|n| n.booking_id != booking.id) {
            return Err(StorageError::Corrupt(format!(
                "notification references unknown booking {}",
                n.booking_id
            )));
        }

        let slot = tables
            .time_slots
            .iter_mut()
            .find(|s| s.start_time == booking.time_slot);
        let claim = match slot {
            None => SlotClaim::Unlisted,
            Some(slot) if !slot.is_available => return Ok(SlotClaim::Taken),
            Some(slot) => {
                slot.claim(&booking.id);
                SlotClaim::Claimed(slot.clone())
            }
        };

        tables.bookings.push(booking.clone());
        tables.notifications.extend(notifications.iter().cloned());
        Ok(claim)
    }

    fn get_booking(&self, id: &str) -> Result<Option<Booking>, StorageError> {
        Ok(self.lock()?.bookings.iter().find(|b| b.id == id).cloned())
    }

    fn list_bookings(&self) -> Result<Vec<Booking>, StorageError> {
        Ok(self.lock()?.bookings.clone())
    }

    fn update_booking_status(
        &self,
        id: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, StorageError> {
        let mut tables = self.lock()?;
        let updated = tables
            .bookings
            .iter_mut()
            .find(|b| b.id == id && b.status == from)
            .map(|b| {
                b.status = to;
                b.clone()
            });

        if updated.is_some() && to == BookingStatus::Cancelled {
            for slot in tables
                .time_slots
                .iter_mut()
                .filter(|s| s.booking_id.as_deref() == Some(id))
            {
                slot.release();
            }
        }
        Ok(updated)
    }
}

impl NotificationRepository for MemoryStore {
    fn create_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        tables.check_notification(notification)?;
        tables.notifications.push(notification.clone());
        Ok(())
    }

    fn resolve_pending(
        &self,
        booking_id: &str,
        recipient: Recipient,
        status: NotificationStatus,
        at: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        let mut tables = self.lock()?;
        let mut count = 0;
        for n in tables.notifications.iter_mut().filter(|n| {
            n.booking_id == booking_id
                && n.recipient == recipient
                && n.status == NotificationStatus::Pending
        }) {
            n.status = status;
            n.sent_at = Some(at);
            count += 1;
        }
        Ok(count)
    }

    fn list_notifications(&self, booking_id: &str) -> Result<Vec<Notification>, StorageError> {
        Ok(self
            .lock()?
            .notifications
            .iter()
            .filter(|n| n.booking_id == booking_id)
            .cloned()
            .collect())
    }
}

impl ReviewRepository for MemoryStore {
    fn create_review(&self, review: &Review) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        tables.check_review(review)?;
        tables.reviews.push(review.clone());
        Ok(())
    }

    fn create_invitation(&self, review: &Review, notification: &Notification) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        tables.check_review(review)?;
        tables.check_notification(notification)?;
        tables.reviews.push(review.clone());
        tables.notifications.push(notification.clone());
        Ok(())
    }

    fn get_review(&self, id: &str) -> Result<Option<Review>, StorageError> {
        Ok(self.lock()?.reviews.iter().find(|r| r.id == id).cloned())
    }

    fn get_review_by_token(&self, token: &str) -> Result<Option<Review>, StorageError> {
        Ok(self
            .lock()?
            .reviews
            .iter()
            .find(|r| r.review_token == token)
            .cloned())
    }

    fn submit_review(
        &self,
        token: &str,
        content: &ReviewContent,
        is_published: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Review>, StorageError> {
        let mut tables = self.lock()?;
        let submitted = tables
            .reviews
            .iter_mut()
            .find(|r| r.review_token == token && r.submitted_at.is_none())
            .map(|r| {
                r.rating = Some(content.rating);
                r.comment = Some(content.comment.clone());
                r.images = content.images.clone();
                r.submitted_at = Some(at);
                r.is_published = is_published;
                r.clone()
            });
        Ok(submitted)
    }

    fn list_reviews(&self) -> Result<Vec<Review>, StorageError> {
        Ok(self.lock()?.reviews.clone())
    }

    fn list_published_reviews(&self, min_rating: Option<u8>) -> Result<Vec<Review>, StorageError> {
        let mut reviews: Vec<Review> = self
            .lock()?
            .reviews
            .iter()
            .filter(|r| r.is_published && r.is_submitted())
            .filter(|r| match min_rating {
                Some(min) => r.rating.is_some_and(|rating| rating >= min),
                None => true,
            })
            .cloned()
            .collect();
        reviews.sort_by(published_order);
        Ok(reviews)
    }

    fn set_published(&self, id: &str, is_published: bool) -> Result<bool, StorageError> {
        let mut tables = self.lock()?;
        match tables.reviews.iter_mut().find(|r| r.id == id) {
            Some(review) => {
                review.is_published = is_published;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_review(&self, id: &str) -> Result<bool, StorageError> {
        let mut tables = self.lock()?;
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() < before)
    }
}

impl TimeSlotRepository for MemoryStore {
    fn create_time_slot(&self, slot: &TimeSlot) -> Result<bool, StorageError> {
        let mut tables = self.lock()?;
        if tables.time_slots.iter().any(|s| s.start_time == slot.start_time) {
            return Ok(false);
        }
        tables.time_slots.push(slot.clone());
        Ok(true)
    }

    fn list_available_slots(&self, from: DateTime<Utc>) -> Result<Vec<TimeSlot>, StorageError> {
        let mut slots: Vec<TimeSlot> = self
            .lock()?
            .time_slots
            .iter()
            .filter(|s| s.is_available && s.start_time >= from)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    fn list_time_slots(&self) -> Result<Vec<TimeSlot>, StorageError> {
        let mut slots = self.lock()?.time_slots.clone();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewBooking, NewTimeSlot, NotificationChannel};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, 1, 9, 0, 0).unwrap()
    }

    fn booking_at(time_slot: DateTime<Utc>) -> Booking {
        Booking::new(NewBooking {
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_phone: "555-0100".to_string(),
            service_type: "interior".to_string(),
            project_details: None,
            time_slot,
        })
    }

    fn slot_at(start_time: DateTime<Utc>) -> TimeSlot {
        TimeSlot::new(NewTimeSlot {
            start_time,
            end_time: start_time + Duration::hours(2),
        })
    }

    #[test]
    fn test_taken_slot_writes_nothing() {
        let store = MemoryStore::default();
        store.create_time_slot(&slot_at(start())).unwrap();

        let first = booking_at(start());
        assert!(matches!(store.create_booking(&first, &[]).unwrap(), SlotClaim::Claimed(_)));

        let second = booking_at(start());
        let n = Notification::pending(&second.id, NotificationChannel::Email, Recipient::Customer, "hi".into());
        assert_eq!(store.create_booking(&second, &[n]).unwrap(), SlotClaim::Taken);
        assert!(store.get_booking(&second.id).unwrap().is_none());
        assert!(store.list_notifications(&second.id).unwrap().is_empty());
    }

    #[test]
    fn test_cancel_releases_slot() {
        let store = MemoryStore::default();
        store.create_time_slot(&slot_at(start())).unwrap();
        let booking = booking_at(start());
        store.create_booking(&booking, &[]).unwrap();
        assert!(store.list_available_slots(start()).unwrap().is_empty());

        store
            .update_booking_status(&booking.id, BookingStatus::Pending, BookingStatus::Cancelled)
            .unwrap();

        let open = store.list_available_slots(start()).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].booking_id, None);
    }

    #[test]
    fn test_invitation_is_all_or_nothing() {
        let store = MemoryStore::default();
        let booking = booking_at(start());
        store.create_booking(&booking, &[]).unwrap();

        let review = Review::placeholder(&booking, "tok".to_string());
        let orphan = Notification::pending("missing", NotificationChannel::Email, Recipient::Customer, "hi".into());
        assert!(store.create_invitation(&review, &orphan).is_err());
        assert!(store.get_review_by_token("tok").unwrap().is_none());

        let n = Notification::pending(&booking.id, NotificationChannel::Email, Recipient::Customer, "hi".into());
        store.create_invitation(&review, &n).unwrap();
        assert!(store.get_review_by_token("tok").unwrap().is_some());
        assert_eq!(store.list_notifications(&booking.id).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_slot_start_is_refused() {
        let store = MemoryStore::default();
        assert!(store.create_time_slot(&slot_at(start())).unwrap());
        assert!(!store.create_time_slot(&slot_at(start())).unwrap());
        assert_eq!(store.list_time_slots().unwrap().len(), 1);
    }
}
