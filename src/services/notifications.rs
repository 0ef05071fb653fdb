use crate::errors::AppError;
use crate::models::{self, Notification, NotificationChannel, NotificationStatus, Recipient};
use crate::repository::Repositories;
use crate::services::email::{EmailMessage, EmailProvider};

pub fn create_notification(
    store: &Repositories,
    booking_id: &str,
    channel: NotificationChannel,
    recipient: Recipient,
    content: String,
) -> Result<Notification, AppError> {
    if store.bookings.get_booking(booking_id)?.is_none() {
        return Err(AppError::NotFound(format!("booking {booking_id}")));
    }

    let notification = Notification::pending(booking_id, channel, recipient, content);
    store.notifications.create_notification(&notification)?;
    Ok(notification)
}

pub fn mark_sent(store: &Repositories, booking_id: &str, recipient: Recipient) -> Result<usize, AppError> {
    resolve(store, booking_id, recipient, NotificationStatus::Sent)
}

pub fn mark_failed(store: &Repositories, booking_id: &str, recipient: Recipient) -> Result<usize, AppError> {
    resolve(store, booking_id, recipient, NotificationStatus::Failed)
}

fn resolve(
    store: &Repositories,
    booking_id: &str,
    recipient: Recipient,
    status: NotificationStatus,
) -> Result<usize, AppError> {
    let updated = store
        .notifications
        .resolve_pending(booking_id, recipient, status, models::now())?;
    if updated == 0 {
        tracing::debug!(booking_id, recipient = recipient.as_str(), "no pending notification to resolve");
    }
    Ok(updated)
}

pub fn list_for_booking(store: &Repositories, booking_id: &str) -> Result<Vec<Notification>, AppError> {
    if store.bookings.get_booking(booking_id)?.is_none() {
        return Err(AppError::NotFound(format!("booking {booking_id}")));
    }
    Ok(store.notifications.list_notifications(booking_id)?)
}

/// Sends `message` and records the outcome against the pending notification
/// for `(booking_id, recipient)`. Never fails: a send error becomes a
/// `failed` notification, a recording error is logged.
pub async fn deliver(
    store: &Repositories,
    email: &dyn EmailProvider,
    booking_id: &str,
    recipient: Recipient,
    message: &EmailMessage,
) -> NotificationStatus {
    let outcome = match email.send(message).await {
        Ok(()) => {
            tracing::info!(booking_id, recipient = recipient.as_str(), "email sent");
            NotificationStatus::Sent
        }
        Err(e) => {
            tracing::warn!(booking_id, recipient = recipient.as_str(), error = %e, "email dispatch failed");
            NotificationStatus::Failed
        }
    };

    let recorded = match outcome {
        NotificationStatus::Sent => mark_sent(store, booking_id, recipient),
        _ => mark_failed(store, booking_id, recipient),
    };
    if let Err(e) = recorded {
        tracing::error!(booking_id, recipient = recipient.as_str(), error = %e, "failed to record notification outcome");
    }

    outcome
}
