use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Booking;

/// A customer review tied to a booking.
///
/// Reviews issued through an invitation start as placeholders: the token
/// exists, `rating`/`comment` are empty and `submitted_at` is `None` until the
/// customer redeems the token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub booking_id: String,
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub customer_name: String,
    pub service_type: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub review_token: String,
}

/// Where a review sits in moderation. `Submitted` covers both a fresh
/// redemption awaiting review and one an administrator took down.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
    Unsubmitted,
    Submitted,
    Published,
}

/// Review content supplied by the customer or an administrator.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewContent {
    pub rating: u8,
    pub comment: String,
    pub images: Vec<String>,
}

impl Review {
    /// Placeholder issued with an invitation; content arrives on redemption.
    pub fn placeholder(booking: &Booking, review_token: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            rating: None,
            comment: None,
            customer_name: booking.customer_name.clone(),
            service_type: booking.service_type.clone(),
            images: Vec::new(),
            created_at: super::now(),
            submitted_at: None,
            is_published: false,
            review_token,
        }
    }

    /// Fully formed review entered directly by an administrator.
    pub fn submitted(
        booking_id: &str,
        customer_name: String,
        service_type: String,
        content: ReviewContent,
        review_token: String,
        is_published: bool,
    ) -> Self {
        let now = super::now();
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: booking_id.to_string(),
            rating: Some(content.rating),
            comment: Some(content.comment),
            customer_name,
            service_type,
            images: content.images,
            created_at: now,
            submitted_at: Some(now),
            is_published,
            review_token,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    pub fn state(&self) -> ReviewState {
        match (self.is_submitted(), self.is_published) {
            (false, _) => ReviewState::Unsubmitted,
            (true, true) => ReviewState::Published,
            (true, false) => ReviewState::Submitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, Booking};

    fn booking() -> Booking {
        Booking {
            id: "b-1".to_string(),
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_phone: "555-0100".to_string(),
            service_type: "interior".to_string(),
            project_details: None,
            time_slot: Utc::now(),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_placeholder_copies_booking_identity() {
        let review = Review::placeholder(&booking(), "tok".to_string());

        assert_eq!(review.booking_id, "b-1");
        assert_eq!(review.customer_name, "Jane Doe");
        assert_eq!(review.service_type, "interior");
        assert!(!review.is_published);
        assert_eq!(review.state(), ReviewState::Unsubmitted);
    }

    #[test]
    fn test_state_follows_publish_flag_once_submitted() {
        let content = ReviewContent {
            rating: 5,
            comment: "Great work on the trim".to_string(),
            images: vec![],
        };
        let mut review = Review::submitted(
            "b-1",
            "Jane Doe".to_string(),
            "interior".to_string(),
            content,
            "tok".to_string(),
            true,
        );
        assert_eq!(review.state(), ReviewState::Published);

        review.is_published = false;
        assert_eq!(review.state(), ReviewState::Submitted);
    }

    #[test]
    fn test_placeholder_stays_unsubmitted_even_if_flagged() {
        let mut review = Review::placeholder(&booking(), "tok".to_string());
        review.is_published = true;
        assert_eq!(review.state(), ReviewState::Unsubmitted);
    }

    #[test]
    fn test_state_filter_parses_from_query_text() {
        let state: ReviewState = serde_json::from_str("\"submitted\"").unwrap();
        assert_eq!(state, ReviewState::Submitted);
        assert!(serde_json::from_str::<ReviewState>("\"hidden\"").is_err());
    }
}
