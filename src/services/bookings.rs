use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Notification, NotificationChannel, Recipient};
use crate::repository::{Repositories, SlotClaim};
use crate::services::email;
use crate::services::notifications;
use crate::state::AppState;
use crate::validation;

/// Validates and stores a booking, then emails the customer (and the admin
/// when `ADMIN_EMAIL` is set). The booking is committed before any email is
/// attempted; dispatch outcomes only touch notification rows. A listed slot
/// at the requested time is claimed with the booking; a taken one is a 409.
pub async fn submit_booking(state: &AppState, payload: &Map<String, Value>) -> Result<Booking, AppError> {
    let fields = validation::validate_booking(payload)?;
    let booking = Booking::new(fields);

    let confirmation = email::booking_confirmation(&booking);
    let alert = state
        .config
        .admin_email
        .as_deref()
        .map(|to| email::admin_alert(&booking, to));

    let mut pending = vec![Notification::pending(
        &booking.id,
        NotificationChannel::Email,
        Recipient::Customer,
        confirmation.subject.clone(),
    )];
    if let Some(alert) = &alert {
        pending.push(Notification::pending(
            &booking.id,
            NotificationChannel::Email,
            Recipient::Admin,
            alert.subject.clone(),
        ));
    }

    let slot_id = match state.store.bookings.create_booking(&booking, &pending)? {
        SlotClaim::Taken => {
            return Err(AppError::Conflict(format!(
                "time slot {} is already booked",
                booking.time_slot.to_rfc3339()
            )));
        }
        SlotClaim::Claimed(slot) => Some(slot.id),
        SlotClaim::Unlisted => None,
    };
    tracing::info!(
        booking_id = %booking.id,
        service_type = %booking.service_type,
        time_slot = %booking.time_slot,
        slot_id = slot_id.as_deref().unwrap_or("-"),
        "booking created"
    );

    let customer = notifications::deliver(
        &state.store,
        state.email.as_ref(),
        &booking.id,
        Recipient::Customer,
        &confirmation,
    );
    match &alert {
        Some(alert) => {
            let admin = notifications::deliver(
                &state.store,
                state.email.as_ref(),
                &booking.id,
                Recipient::Admin,
                alert,
            );
            tokio::join!(customer, admin);
        }
        None => {
            customer.await;
        }
    }

    Ok(booking)
}

pub fn get_booking(store: &Repositories, id: &str) -> Result<Booking, AppError> {
    store
        .bookings
        .get_booking(id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn list_bookings(store: &Repositories) -> Result<Vec<Booking>, AppError> {
    Ok(store.bookings.list_bookings()?)
}

/// Moves a booking to `target` if the lifecycle allows it.
pub fn transition_booking(store: &Repositories, id: &str, target: BookingStatus) -> Result<Booking, AppError> {
    let current = get_booking(store, id)?;
    if !current.status.can_transition_to(target) {
        return Err(AppError::Conflict(format!(
            "booking {id} cannot move from {} to {}",
            current.status.as_str(),
            target.as_str()
        )));
    }

    // Conditional on the status we just read; a concurrent change loses.
    let updated = store
        .bookings
        .update_booking_status(id, current.status, target)?
        .ok_or_else(|| AppError::Conflict(format!("booking {id} changed concurrently")))?;

    tracing::info!(
        booking_id = %id,
        from = current.status.as_str(),
        to = target.as_str(),
        "booking status changed"
    );
    Ok(updated)
}
