use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{BookingRepository, NotificationRepository, ReviewRepository, SlotClaim, TimeSlotRepository};
use crate::errors::StorageError;
use crate::models::{
    Booking, BookingStatus, Notification, NotificationChannel, NotificationStatus, Recipient,
    Review, ReviewContent, TimeSlot,
};

/// Persistent store over a single SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

// Fixed-width timestamps so text ordering matches time ordering.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad timestamp {s:?}: {e}")))
}

fn parse_enum<T>(s: &str, parse: fn(&str) -> Option<T>, what: &str) -> Result<T, StorageError> {
    parse(s).ok_or_else(|| StorageError::Corrupt(format!("unknown {what} {s:?}")))
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, service_type, \
     project_details, time_slot, status, created_at";

fn insert_notification(conn: &Connection, n: &Notification) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO notifications (id, booking_id, channel, recipient, status, content, created_at, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            n.id,
            n.booking_id,
            n.channel.as_str(),
            n.recipient.as_str(),
            n.status.as_str(),
            n.content,
            ts(&n.created_at),
            n.sent_at.as_ref().map(ts),
        ],
    )?;
    Ok(())
}

fn parse_booking_row(row: &Row) -> Result<Booking, StorageError> {
    let time_slot: String = row.get(6)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(Booking {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        customer_email: row.get(2)?,
        customer_phone: row.get(3)?,
        service_type: row.get(4)?,
        project_details: row.get(5)?,
        time_slot: parse_ts(&time_slot)?,
        status: parse_enum(&status, BookingStatus::parse, "booking status")?,
        created_at: parse_ts(&created_at)?,
    })
}

fn find_booking(conn: &Connection, id: &str) -> Result<Option<Booking>, StorageError> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    )
    .optional()?
    .transpose()
}

impl BookingRepository for SqliteStore {
    fn create_booking(&self, booking: &Booking, notifications: &[Notification]) -> Result<SlotClaim, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let listed = find_slot_at(&tx, &booking.time_slot)?;
        if listed.as_ref().is_some_and(|slot| !slot.is_available) {
            return Ok(SlotClaim::Taken);
        }

        tx.execute(
            &format!("INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                booking.id,
                booking.customer_name,
                booking.customer_email,
                booking.customer_phone,
                booking.service_type,
                booking.project_details,
                ts(&booking.time_slot),
                booking.status.as_str(),
                ts(&booking.created_at),
            ],
        )?;

        for n in notifications {
            insert_notification(&tx, n)?;
        }

        let claim = match listed {
            None => SlotClaim::Unlisted,
            Some(mut slot) => {
                tx.execute(
                    "UPDATE time_slots SET is_available = 0, booking_id = ?1 WHERE id = ?2 AND is_available = 1",
                    params![booking.id, slot.id],
                )?;
                slot.claim(&booking.id);
                SlotClaim::Claimed(slot)
            }
        };

        tx.commit()?;
        Ok(claim)
    }

    fn get_booking(&self, id: &str) -> Result<Option<Booking>, StorageError> {
        let conn = self.lock()?;
        find_booking(&conn, id)
    }

    fn list_bookings(&self) -> Result<Vec<Booking>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY rowid ASC"))?;
        let rows = stmt.query_map([], |row| Ok(parse_booking_row(row)))?;

        let mut bookings = vec![];
        for row in rows {
            bookings.push(row??);
        }
        Ok(bookings)
    }

    fn update_booking_status(
        &self,
        id: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let count = tx.execute(
            "UPDATE bookings SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.as_str(), id, from.as_str()],
        )?;
        if count == 0 {
            return Ok(None);
        }
        if to == BookingStatus::Cancelled {
            tx.execute(
                "UPDATE time_slots SET is_available = 1, booking_id = NULL WHERE booking_id = ?1",
                params![id],
            )?;
        }
        let booking = find_booking(&tx, id)?;
        tx.commit()?;
        Ok(booking)
    }
}

// ── Notifications ──

fn parse_notification_row(row: &Row) -> Result<Notification, StorageError> {
    let channel: String = row.get(2)?;
    let recipient: String = row.get(3)?;
    let status: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let sent_at: Option<String> = row.get(7)?;

    Ok(Notification {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        channel: parse_enum(&channel, NotificationChannel::parse, "notification channel")?,
        recipient: parse_enum(&recipient, Recipient::parse, "recipient")?,
        status: parse_enum(&status, NotificationStatus::parse, "notification status")?,
        content: row.get(5)?,
        created_at: parse_ts(&created_at)?,
        sent_at: sent_at.as_deref().map(parse_ts).transpose()?,
    })
}

impl NotificationRepository for SqliteStore {
    fn create_notification(&self, notification: &Notification) -> Result<(), StorageError> {
        let conn = self.lock()?;
        insert_notification(&conn, notification)
    }

    fn resolve_pending(
        &self,
        booking_id: &str,
        recipient: Recipient,
        status: NotificationStatus,
        at: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        let conn = self.lock()?;
        let count = conn.execute(
            "UPDATE notifications SET status = ?1, sent_at = ?2
             WHERE booking_id = ?3 AND recipient = ?4 AND status = 'pending'",
            params![status.as_str(), ts(&at), booking_id, recipient.as_str()],
        )?;
        Ok(count)
    }

    fn list_notifications(&self, booking_id: &str) -> Result<Vec<Notification>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, booking_id, channel, recipient, status, content, created_at, sent_at
             FROM notifications WHERE booking_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![booking_id], |row| Ok(parse_notification_row(row)))?;

        let mut notifications = vec![];
        for row in rows {
            notifications.push(row??);
        }
        Ok(notifications)
    }
}

// ── Reviews ──

const REVIEW_COLUMNS: &str = "id, booking_id, rating, comment, customer_name, service_type, images, \
     created_at, submitted_at, is_published, review_token";

fn parse_review_row(row: &Row) -> Result<Review, StorageError> {
    let rating: Option<i64> = row.get(2)?;
    let images: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let submitted_at: Option<String> = row.get(8)?;

    let rating = rating
        .map(|r| u8::try_from(r).map_err(|_| StorageError::Corrupt(format!("rating {r} out of range"))))
        .transpose()?;

    Ok(Review {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        rating,
        comment: row.get(3)?,
        customer_name: row.get(4)?,
        service_type: row.get(5)?,
        images: serde_json::from_str(&images)?,
        created_at: parse_ts(&created_at)?,
        submitted_at: submitted_at.as_deref().map(parse_ts).transpose()?,
        is_published: row.get(9)?,
        review_token: row.get(10)?,
    })
}

fn query_reviews(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Review>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_review_row(row)))?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row??);
    }
    Ok(reviews)
}

fn find_review(conn: &Connection, column: &str, value: &str) -> Result<Option<Review>, StorageError> {
    conn.query_row(
        &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE {column} = ?1"),
        params![value],
        |row| Ok(parse_review_row(row)),
    )
    .optional()?
    .transpose()
}

fn insert_review(conn: &Connection, review: &Review) -> Result<(), StorageError> {
    conn.execute(
        &format!("INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        params![
            review.id,
            review.booking_id,
            review.rating,
            review.comment,
            review.customer_name,
            review.service_type,
            serde_json::to_string(&review.images)?,
            ts(&review.created_at),
            review.submitted_at.as_ref().map(ts),
            review.is_published,
            review.review_token,
        ],
    )?;
    Ok(())
}

impl ReviewRepository for SqliteStore {
    fn create_review(&self, review: &Review) -> Result<(), StorageError> {
        let conn = self.lock()?;
        insert_review(&conn, review)
    }

    fn create_invitation(&self, review: &Review, notification: &Notification) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_review(&tx, review)?;
        insert_notification(&tx, notification)?;
        tx.commit()?;
        Ok(())
    }

    fn get_review(&self, id: &str) -> Result<Option<Review>, StorageError> {
        let conn = self.lock()?;
        find_review(&conn, "id", id)
    }

    fn get_review_by_token(&self, token: &str) -> Result<Option<Review>, StorageError> {
        let conn = self.lock()?;
        find_review(&conn, "review_token", token)
    }

    fn submit_review(
        &self,
        token: &str,
        content: &ReviewContent,
        is_published: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Review>, StorageError> {
        let conn = self.lock()?;
        let count = conn.execute(
            "UPDATE reviews SET rating = ?1, comment = ?2, images = ?3, submitted_at = ?4, is_published = ?5
             WHERE review_token = ?6 AND submitted_at IS NULL",
            params![
                content.rating,
                content.comment,
                serde_json::to_string(&content.images)?,
                ts(&at),
                is_published,
                token,
            ],
        )?;
        if count == 0 {
            return Ok(None);
        }
        find_review(&conn, "review_token", token)
    }

    fn list_reviews(&self) -> Result<Vec<Review>, StorageError> {
        let conn = self.lock()?;
        query_reviews(
            &conn,
            &format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY rowid ASC"),
            [],
        )
    }

    fn list_published_reviews(&self, min_rating: Option<u8>) -> Result<Vec<Review>, StorageError> {
        let conn = self.lock()?;
        query_reviews(
            &conn,
            &format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews
                 WHERE is_published = 1 AND submitted_at IS NOT NULL AND rating >= ?1
                 ORDER BY submitted_at DESC, id ASC"
            ),
            params![min_rating.unwrap_or(1)],
        )
    }

    fn set_published(&self, id: &str, is_published: bool) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let count = conn.execute(
            "UPDATE reviews SET is_published = ?1 WHERE id = ?2",
            params![is_published, id],
        )?;
        Ok(count > 0)
    }

    fn delete_review(&self, id: &str) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let count = conn.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
        Ok(count > 0)
    }
}

// ── Time slots ──

const SLOT_COLUMNS: &str = "id, start_time, end_time, is_available, booking_id";

fn parse_slot_row(row: &Row) -> Result<TimeSlot, StorageError> {
    let start_time: String = row.get(1)?;
    let end_time: String = row.get(2)?;

    Ok(TimeSlot {
        id: row.get(0)?,
        start_time: parse_ts(&start_time)?,
        end_time: parse_ts(&end_time)?,
        is_available: row.get(3)?,
        booking_id: row.get(4)?,
    })
}

fn find_slot_at(conn: &Connection, start_time: &DateTime<Utc>) -> Result<Option<TimeSlot>, StorageError> {
    conn.query_row(
        &format!("SELECT {SLOT_COLUMNS} FROM time_slots WHERE start_time = ?1"),
        params![ts(start_time)],
        |row| Ok(parse_slot_row(row)),
    )
    .optional()?
    .transpose()
}

fn query_slots(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<TimeSlot>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_slot_row(row)))?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row??);
    }
    Ok(slots)
}

impl TimeSlotRepository for SqliteStore {
    fn create_time_slot(&self, slot: &TimeSlot) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let count = conn.execute(
            &format!(
                "INSERT INTO time_slots ({SLOT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(start_time) DO NOTHING"
            ),
            params![
                slot.id,
                ts(&slot.start_time),
                ts(&slot.end_time),
                slot.is_available,
                slot.booking_id,
            ],
        )?;
        Ok(count > 0)
    }

    fn list_available_slots(&self, from: DateTime<Utc>) -> Result<Vec<TimeSlot>, StorageError> {
        let conn = self.lock()?;
        query_slots(
            &conn,
            &format!(
                "SELECT {SLOT_COLUMNS} FROM time_slots
                 WHERE is_available = 1 AND start_time >= ?1
                 ORDER BY start_time ASC"
            ),
            params![ts(&from)],
        )
    }

    fn list_time_slots(&self) -> Result<Vec<TimeSlot>, StorageError> {
        let conn = self.lock()?;
        query_slots(
            &conn,
            &format!("SELECT {SLOT_COLUMNS} FROM time_slots ORDER BY start_time ASC"),
            [],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Duration;

    fn store() -> SqliteStore {
        SqliteStore::new(db::init_db(":memory:").unwrap())
    }

    fn booking(name: &str) -> Booking {
        Booking {
            id: format!("b-{name}"),
            customer_name: name.to_string(),
            customer_email: format!("{name}@example.com"),
            customer_phone: "555-0100".to_string(),
            service_type: "interior".to_string(),
            project_details: Some("Repaint living room".to_string()),
            time_slot: Utc::now() + Duration::days(3),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_booking_round_trip_preserves_fields() {
        let store = store();
        let b = booking("jane");
        let n = Notification::pending(&b.id, NotificationChannel::Email, Recipient::Customer, "hi".into());
        store.create_booking(&b, &[n.clone()]).unwrap();

        let loaded = store.get_booking(&b.id).unwrap().unwrap();
        assert_eq!(loaded.customer_email, b.customer_email);
        assert_eq!(loaded.project_details, b.project_details);
        assert_eq!(loaded.status, BookingStatus::Pending);
        assert_eq!(ts(&loaded.time_slot), ts(&b.time_slot));

        let notifications = store.list_notifications(&b.id).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].id, n.id);
    }

    #[test]
    fn test_failed_notification_insert_rolls_back_booking() {
        let store = store();
        let b = booking("jane");
        let n = Notification::pending("no-such-booking", NotificationChannel::Email, Recipient::Customer, "hi".into());

        assert!(store.create_booking(&b, &[n]).is_err());
        assert!(store.get_booking(&b.id).unwrap().is_none());
        assert!(store.list_bookings().unwrap().is_empty());
    }

    #[test]
    fn test_list_bookings_in_insertion_order() {
        let store = store();
        for name in ["zed", "amy", "max"] {
            store.create_booking(&booking(name), &[]).unwrap();
        }
        let names: Vec<String> = store
            .list_bookings()
            .unwrap()
            .into_iter()
            .map(|b| b.customer_name)
            .collect();
        assert_eq!(names, vec!["zed", "amy", "max"]);
    }

    #[test]
    fn test_status_update_is_conditional() {
        let store = store();
        let b = booking("jane");
        store.create_booking(&b, &[]).unwrap();

        let updated = store
            .update_booking_status(&b.id, BookingStatus::Pending, BookingStatus::Confirmed)
            .unwrap();
        assert_eq!(updated.unwrap().status, BookingStatus::Confirmed);

        let stale = store
            .update_booking_status(&b.id, BookingStatus::Pending, BookingStatus::Cancelled)
            .unwrap();
        assert!(stale.is_none());
    }

    #[test]
    fn test_resolve_pending_never_overwrites_terminal_state() {
        let store = store();
        let b = booking("jane");
        let n = Notification::pending(&b.id, NotificationChannel::Email, Recipient::Customer, "hi".into());
        store.create_booking(&b, &[n]).unwrap();

        let first = store
            .resolve_pending(&b.id, Recipient::Customer, NotificationStatus::Failed, Utc::now())
            .unwrap();
        let second = store
            .resolve_pending(&b.id, Recipient::Customer, NotificationStatus::Sent, Utc::now())
            .unwrap();
        assert_eq!((first, second), (1, 0));

        let n = &store.list_notifications(&b.id).unwrap()[0];
        assert_eq!(n.status, NotificationStatus::Failed);
        assert!(n.sent_at.is_some());
    }

    #[test]
    fn test_review_token_redeems_once() {
        let store = store();
        let b = booking("jane");
        store.create_booking(&b, &[]).unwrap();
        let placeholder = Review::placeholder(&b, "token-1".to_string());
        store.create_review(&placeholder).unwrap();

        let content = ReviewContent {
            rating: 4,
            comment: "Careful, tidy crew".to_string(),
            images: vec!["https://cdn.example.com/a.jpg".to_string()],
        };
        let submitted = store
            .submit_review("token-1", &content, false, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(submitted.rating, Some(4));
        assert_eq!(submitted.images, content.images);

        assert!(store
            .submit_review("token-1", &content, false, Utc::now())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_review_tokens_are_unique() {
        let store = store();
        let b = booking("jane");
        store.create_booking(&b, &[]).unwrap();

        store.create_review(&Review::placeholder(&b, "same".into())).unwrap();
        let dup = store.create_review(&Review::placeholder(&b, "same".into()));
        assert!(matches!(dup, Err(StorageError::Sqlite(_))));
    }

    #[test]
    fn test_published_listing_filters_and_orders() {
        let store = store();
        let b = booking("jane");
        store.create_booking(&b, &[]).unwrap();

        let t0 = Utc::now();
        for (token, rating, publish, offset) in [
            ("a", 5, true, 1),
            ("b", 3, true, 2),
            ("c", 5, false, 3),
            ("d", 4, true, 4),
        ] {
            store.create_review(&Review::placeholder(&b, token.into())).unwrap();
            let content = ReviewContent {
                rating,
                comment: "Would hire again".into(),
                images: vec![],
            };
            store
                .submit_review(token, &content, publish, t0 + Duration::seconds(offset))
                .unwrap();
        }
        store.create_review(&Review::placeholder(&b, "e".into())).unwrap();

        let all: Vec<String> = store
            .list_published_reviews(None)
            .unwrap()
            .into_iter()
            .map(|r| r.review_token)
            .collect();
        assert_eq!(all, vec!["d", "b", "a"]);

        let top: Vec<String> = store
            .list_published_reviews(Some(4))
            .unwrap()
            .into_iter()
            .map(|r| r.review_token)
            .collect();
        assert_eq!(top, vec!["d", "a"]);
    }

    #[test]
    fn test_delete_review_is_hard() {
        let store = store();
        let b = booking("jane");
        store.create_booking(&b, &[]).unwrap();
        let review = Review::placeholder(&b, "tok".into());
        store.create_review(&review).unwrap();

        assert!(store.delete_review(&review.id).unwrap());
        assert!(!store.delete_review(&review.id).unwrap());
        assert!(store.get_review_by_token("tok").unwrap().is_none());
    }

    fn fresh_booking(time_slot: DateTime<Utc>) -> Booking {
        Booking::new(crate::models::NewBooking {
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_phone: "555-0100".to_string(),
            service_type: "interior".to_string(),
            project_details: Some("Repaint living room".to_string()),
            time_slot,
        })
    }

    fn slot_at(start_time: DateTime<Utc>) -> TimeSlot {
        TimeSlot::new(crate::models::NewTimeSlot {
            start_time,
            end_time: start_time + Duration::hours(2),
        })
    }

    #[test]
    fn test_constructed_entities_survive_storage_unchanged() {
        let store = store();
        let b = fresh_booking(Utc::now() + Duration::days(3));
        let n = Notification::pending(&b.id, NotificationChannel::Email, Recipient::Customer, "hi".into());
        store.create_booking(&b, &[n.clone()]).unwrap();

        assert_eq!(store.get_booking(&b.id).unwrap(), Some(b.clone()));
        assert_eq!(store.list_notifications(&b.id).unwrap(), vec![n]);

        let placeholder = Review::placeholder(&b, "token-1".to_string());
        store.create_review(&placeholder).unwrap();
        assert_eq!(store.get_review(&placeholder.id).unwrap(), Some(placeholder));

        let direct = Review::submitted(
            &b.id,
            "Jane Doe".to_string(),
            "interior".to_string(),
            ReviewContent {
                rating: 5,
                comment: "Spotless finish".to_string(),
                images: vec!["https://cdn.example.com/a.jpg".to_string()],
            },
            "token-2".to_string(),
            true,
        );
        store.create_review(&direct).unwrap();
        assert_eq!(store.get_review(&direct.id).unwrap(), Some(direct));
    }

    #[test]
    fn test_booking_claims_listed_slot_once() {
        let store = store();
        let start = crate::models::now() + Duration::days(5);
        let slot = slot_at(start);
        assert!(store.create_time_slot(&slot).unwrap());

        let first = fresh_booking(start);
        match store.create_booking(&first, &[]).unwrap() {
            SlotClaim::Claimed(claimed) => {
                assert_eq!(claimed.id, slot.id);
                assert_eq!(claimed.booking_id.as_deref(), Some(first.id.as_str()));
            }
            other => panic!("expected claim, got {other:?}"),
        }

        let second = fresh_booking(start);
        let n = Notification::pending(&second.id, NotificationChannel::Email, Recipient::Customer, "hi".into());
        assert_eq!(store.create_booking(&second, &[n]).unwrap(), SlotClaim::Taken);
        assert!(store.get_booking(&second.id).unwrap().is_none());
        assert!(store.list_notifications(&second.id).unwrap().is_empty());

        let unlisted = fresh_booking(start + Duration::hours(1));
        assert_eq!(store.create_booking(&unlisted, &[]).unwrap(), SlotClaim::Unlisted);
    }

    #[test]
    fn test_cancel_frees_slot_but_confirm_keeps_it() {
        let store = store();
        let start = crate::models::now() + Duration::days(5);
        store.create_time_slot(&slot_at(start)).unwrap();
        let b = fresh_booking(start);
        store.create_booking(&b, &[]).unwrap();

        store
            .update_booking_status(&b.id, BookingStatus::Pending, BookingStatus::Confirmed)
            .unwrap();
        assert!(store.list_available_slots(start).unwrap().is_empty());

        store
            .update_booking_status(&b.id, BookingStatus::Confirmed, BookingStatus::Cancelled)
            .unwrap();
        let open = store.list_available_slots(start).unwrap();
        assert_eq!(open.len(), 1);
        assert!(open[0].is_available);
        assert_eq!(open[0].booking_id, None);
    }

    #[test]
    fn test_available_slots_from_instant() {
        let store = store();
        let base = crate::models::now() + Duration::days(5);
        for hours in [4, 0, 2] {
            assert!(store.create_time_slot(&slot_at(base + Duration::hours(hours))).unwrap());
        }
        assert!(!store.create_time_slot(&slot_at(base)).unwrap());

        let from_two: Vec<DateTime<Utc>> = store
            .list_available_slots(base + Duration::hours(2))
            .unwrap()
            .into_iter()
            .map(|s| s.start_time)
            .collect();
        assert_eq!(from_two, vec![base + Duration::hours(2), base + Duration::hours(4)]);
        assert_eq!(store.list_time_slots().unwrap().len(), 3);
    }

    #[test]
    fn test_failed_invitation_leaves_no_placeholder() {
        let store = store();
        let b = booking("jane");
        store.create_booking(&b, &[]).unwrap();

        let review = Review::placeholder(&b, "tok".into());
        let orphan = Notification::pending("no-such-booking", NotificationChannel::Email, Recipient::Customer, "hi".into());
        assert!(store.create_invitation(&review, &orphan).is_err());
        assert!(store.get_review_by_token("tok").unwrap().is_none());

        let n = Notification::pending(&b.id, NotificationChannel::Email, Recipient::Customer, "hi".into());
        store.create_invitation(&review, &n).unwrap();
        assert_eq!(store.get_review_by_token("tok").unwrap(), Some(review));
        assert_eq!(store.list_notifications(&b.id).unwrap().len(), 1);
    }
}
