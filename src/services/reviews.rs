use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::{self, Notification, NotificationChannel, Recipient, Review, ReviewState};
use crate::repository::Repositories;
use crate::services::{bookings, email, notifications, token};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Serialize)]
pub struct Invitation {
    pub token: String,
    pub link: String,
    pub review: Review,
}

/// Admin-entered review. Stored submitted and published.
pub fn create_review(store: &Repositories, payload: &Map<String, Value>) -> Result<Review, AppError> {
    let fields = validation::validate_admin_review(payload)?;
    bookings::get_booking(store, &fields.booking_id)?;

    let review = Review::submitted(
        &fields.booking_id,
        fields.customer_name,
        fields.service_type,
        fields.content,
        token::generate_review_token(),
        true,
    );
    store.reviews.create_review(&review)?;

    tracing::info!(review_id = %review.id, booking_id = %review.booking_id, "review created by admin");
    Ok(review)
}

pub fn generate_review_token(store: &Repositories, booking_id: &str) -> Result<String, AppError> {
    bookings::get_booking(store, booking_id)?;
    Ok(token::generate_review_token())
}

pub fn review_link(base_url: &str, token: &str) -> String {
    format!("{base_url}/submit-review/{token}")
}

/// Issues a review token for a booking, stores the unsubmitted placeholder
/// with its pending notification in one write, then emails the link to the
/// customer. The email is best effort.
pub async fn invite_review(state: &AppState, booking_id: &str) -> Result<Invitation, AppError> {
    let booking = bookings::get_booking(&state.store, booking_id)?;
    let token = token::generate_review_token();
    let review = Review::placeholder(&booking, token.clone());

    let link = review_link(&state.config.public_base_url, &token);
    let message = email::review_invitation(&booking, &link);
    let notification = Notification::pending(
        &booking.id,
        NotificationChannel::Email,
        Recipient::Customer,
        message.subject.clone(),
    );

    state.store.reviews.create_invitation(&review, &notification)?;
    tracing::info!(booking_id = %booking.id, review_id = %review.id, "review invitation issued");

    notifications::deliver(
        &state.store,
        state.email.as_ref(),
        &booking.id,
        Recipient::Customer,
        &message,
    )
    .await;

    Ok(Invitation { token, link, review })
}

pub fn get_review_by_token(store: &Repositories, token: &str) -> Result<Review, AppError> {
    store
        .reviews
        .get_review_by_token(token)?
        .ok_or_else(|| AppError::NotFound("review token".to_string()))
}

/// Redeems a review token. A token works once; afterwards it reads as unknown.
pub fn submit_review(state: &AppState, payload: &Map<String, Value>) -> Result<Review, AppError> {
    let submission = validation::validate_review_submission(payload)?;

    let review = state
        .store
        .reviews
        .submit_review(
            &submission.token,
            &submission.content,
            state.config.auto_publish_reviews,
            models::now(),
        )?
        .ok_or_else(|| AppError::NotFound("review token".to_string()))?;

    tracing::info!(
        review_id = %review.id,
        booking_id = %review.booking_id,
        rating = submission.content.rating,
        published = review.is_published,
        "review submitted"
    );
    Ok(review)
}

pub fn get_published_reviews(store: &Repositories, min_rating: Option<u8>) -> Result<Vec<Review>, AppError> {
    Ok(store.reviews.list_published_reviews(min_rating)?)
}

/// Admin view of every review, optionally narrowed to one moderation state.
pub fn list_reviews(store: &Repositories, state: Option<ReviewState>) -> Result<Vec<Review>, AppError> {
    let mut reviews = store.reviews.list_reviews()?;
    if let Some(state) = state {
        reviews.retain(|r| r.state() == state);
    }
    Ok(reviews)
}

pub fn update_publish_status(
    store: &Repositories,
    id: &str,
    payload: &Map<String, Value>,
) -> Result<Review, AppError> {
    let is_published = validation::validate_publish_update(payload)?;

    let review = store
        .reviews
        .get_review(id)?
        .ok_or_else(|| AppError::NotFound(format!("review {id}")))?;
    if is_published && review.state() == ReviewState::Unsubmitted {
        return Err(AppError::Conflict(format!("review {id} has not been submitted")));
    }

    if !store.reviews.set_published(id, is_published)? {
        return Err(AppError::NotFound(format!("review {id}")));
    }
    tracing::info!(review_id = %id, published = is_published, "review visibility changed");

    Ok(Review { is_published, ..review })
}

pub fn delete_review(store: &Repositories, id: &str) -> Result<(), AppError> {
    if !store.reviews.delete_review(id)? {
        return Err(AppError::NotFound(format!("review {id}")));
    }
    tracing::info!(review_id = %id, "review deleted");
    Ok(())
}
