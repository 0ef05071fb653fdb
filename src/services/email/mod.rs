pub mod resend;
pub mod sendgrid;
pub mod smtp;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{AppConfig, EmailProviderKind};
use crate::errors::AppError;
use crate::models::Booking;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Why a send did not go through. Callers record it and move on.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no email provider configured")]
    NotConfigured,

    #[error("email transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), DispatchError>;
}

/// Used when no transport is configured; every send fails.
pub struct DisabledProvider;

#[async_trait]
impl EmailProvider for DisabledProvider {
    async fn send(&self, _message: &EmailMessage) -> Result<(), DispatchError> {
        Err(DispatchError::NotConfigured)
    }
}

pub fn provider_from_config(config: &AppConfig) -> Result<Box<dyn EmailProvider>, AppError> {
    let timeout = Duration::from_secs(config.email_timeout_secs);
    let provider: Box<dyn EmailProvider> = match config.email_provider {
        EmailProviderKind::Disabled => {
            tracing::warn!("no email provider configured, notifications will be marked failed");
            Box::new(DisabledProvider)
        }
        EmailProviderKind::Resend => {
            tracing::info!("using Resend email provider");
            Box::new(resend::ResendProvider::new(
                config.email_api_url.clone(),
                config.email_api_key.clone(),
                config.email_from.clone(),
                timeout,
            )?)
        }
        EmailProviderKind::SendGrid => {
            tracing::info!("using SendGrid email provider");
            Box::new(sendgrid::SendGridProvider::new(
                config.email_api_url.clone(),
                config.email_api_key.clone(),
                config.email_from.clone(),
                timeout,
            )?)
        }
        EmailProviderKind::Smtp => {
            let host = config
                .smtp_host
                .as_deref()
                .ok_or_else(|| AppError::Config("SMTP_HOST must be set when EMAIL_PROVIDER is smtp".to_string()))?;
            tracing::info!(host, port = config.smtp_port, "using SMTP email provider");
            let credentials = config.smtp_user.clone().zip(config.smtp_password.clone());
            Box::new(smtp::SmtpProvider::new(
                host,
                config.smtp_port,
                credentials,
                &config.email_from,
                timeout,
            )?)
        }
    };
    Ok(provider)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("failed to build email http client: {e}")))
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn slot_label(booking: &Booking) -> String {
    booking.time_slot.format("%A, %B %-d %Y at %H:%M UTC").to_string()
}

pub fn booking_confirmation(booking: &Booking) -> EmailMessage {
    let name = escape_html(&booking.customer_name);
    let service = escape_html(&booking.service_type);
    let when = slot_label(booking);

    EmailMessage {
        to: booking.customer_email.clone(),
        subject: "Your Painting Service Booking Confirmation".to_string(),
        html_body: format!(
            "<h1>Booking Confirmation</h1>\
             <p>Dear {name},</p>\
             <p>Thank you for booking with Atlas HomeServices! Here are your booking details:</p>\
             <ul><li>Service: {service}</li><li>Date: {when}</li><li>Reference: {id}</li></ul>\
             <p>We will be in touch shortly to confirm your appointment.</p>",
            id = booking.id,
        ),
        text_body: format!(
            "Dear {},\n\nThank you for booking with Atlas HomeServices!\n\nService: {}\nDate: {}\nReference: {}\n",
            booking.customer_name, booking.service_type, when, booking.id,
        ),
    }
}

pub fn admin_alert(booking: &Booking, admin_email: &str) -> EmailMessage {
    let details = booking.project_details.as_deref().unwrap_or("(none)");
    let when = slot_label(booking);

    EmailMessage {
        to: admin_email.to_string(),
        subject: format!("New booking: {} ({})", booking.customer_name, booking.service_type),
        html_body: format!(
            "<h1>New Booking</h1>\
             <ul><li>Name: {}</li><li>Email: {}</li><li>Phone: {}</li>\
             <li>Service: {}</li><li>Date: {when}</li><li>Details: {}</li><li>Reference: {}</li></ul>",
            escape_html(&booking.customer_name),
            escape_html(&booking.customer_email),
            escape_html(&booking.customer_phone),
            escape_html(&booking.service_type),
            escape_html(details),
            booking.id,
        ),
        text_body: format!(
            "New booking from {} for {}\nEmail: {}\nPhone: {}\nDate: {when}\nDetails: {details}\nReference: {}\n",
            booking.customer_name,
            booking.service_type,
            booking.customer_email,
            booking.customer_phone,
            booking.id,
        ),
    }
}

pub fn review_invitation(booking: &Booking, link: &str) -> EmailMessage {
    let name = escape_html(&booking.customer_name);
    let href = escape_html(link);

    EmailMessage {
        to: booking.customer_email.clone(),
        subject: "Share Your Experience with Atlas HomeServices".to_string(),
        html_body: format!(
            "<h1>Share Your Experience</h1>\
             <p>Dear {name},</p>\
             <p>We value your feedback! Please take a moment to share your experience with our service.</p>\
             <p><a href=\"{href}\">Click here to leave a review</a></p>"
        ),
        text_body: format!(
            "Dear {},\n\nWe value your feedback! Please share your experience by clicking this link: {link}\n",
            booking.customer_name,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::{TimeZone, Utc};

    fn booking() -> Booking {
        Booking {
            id: "b-1".to_string(),
            customer_name: "Jane <Doe>".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_phone: "555-0100".to_string(),
            service_type: "interior".to_string(),
            project_details: Some("Repaint living room".to_string()),
            time_slot: Utc.with_ymd_and_hms(2030, 5, 1, 9, 30, 0).unwrap(),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_confirmation_goes_to_customer_and_escapes_name() {
        let msg = booking_confirmation(&booking());
        assert_eq!(msg.to, "jane@example.com");
        assert!(msg.html_body.contains("Jane &lt;Doe&gt;"));
        assert!(!msg.html_body.contains("<Doe>"));
        assert!(msg.text_body.contains("Wednesday, May 1 2030 at 09:30 UTC"));
    }

    #[test]
    fn test_admin_alert_lists_contact_details() {
        let msg = admin_alert(&booking(), "owner@example.com");
        assert_eq!(msg.to, "owner@example.com");
        assert!(msg.text_body.contains("555-0100"));
        assert!(msg.text_body.contains("Repaint living room"));
    }

    #[test]
    fn test_invitation_contains_link() {
        let msg = review_invitation(&booking(), "https://example.com/submit-review/abc");
        assert!(msg.html_body.contains("href=\"https://example.com/submit-review/abc\""));
        assert!(msg.text_body.contains("https://example.com/submit-review/abc"));
    }

    #[test]
    fn test_smtp_needs_a_host() {
        let config = AppConfig {
            email_provider: EmailProviderKind::Smtp,
            ..AppConfig::default()
        };
        assert!(matches!(provider_from_config(&config), Err(AppError::Config(_))));

        let config = AppConfig {
            smtp_host: Some("smtp.gmail.com".to_string()),
            ..config
        };
        assert!(provider_from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_disabled_provider_always_fails() {
        let msg = booking_confirmation(&booking());
        let result = DisabledProvider.send(&msg).await;
        assert!(matches!(result, Err(DispatchError::NotConfigured)));
    }
}
