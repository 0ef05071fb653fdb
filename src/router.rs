use std::sync::Arc;

use anyhow::Context;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> anyhow::Result<Router> {
    let cors = build_cors_layer(&state.config)?;

    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route(
            "/api/reviews",
            get(handlers::reviews::list_published).post(handlers::reviews::submit_review),
        )
        .route(
            "/api/reviews/token/:token",
            get(handlers::reviews::get_review_by_token),
        )
        .route("/api/time-slots", get(handlers::time_slots::list_available));

    let admin = Router::new()
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route("/api/admin/bookings/:id", get(handlers::admin::get_booking))
        .route(
            "/api/admin/bookings/:id/notifications",
            get(handlers::admin::booking_notifications),
        )
        .route(
            "/api/admin/bookings/:id/confirm",
            post(handlers::admin::confirm_booking),
        )
        .route(
            "/api/admin/bookings/:id/cancel",
            post(handlers::admin::cancel_booking),
        )
        .route(
            "/api/admin/bookings/:id/review-invitation",
            post(handlers::admin::invite_review),
        )
        .route(
            "/api/admin/reviews",
            get(handlers::admin::list_reviews).post(handlers::admin::create_review),
        )
        .route(
            "/api/admin/reviews/:id/publish",
            put(handlers::admin::publish_review),
        )
        .route(
            "/api/admin/reviews/:id",
            delete(handlers::admin::delete_review),
        )
        .route(
            "/api/admin/time-slots",
            get(handlers::admin::list_time_slots).post(handlers::admin::create_time_slot),
        );

    Ok(public
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

/// Any origin unless `CORS_ALLOWED_ORIGIN` names one.
pub fn build_cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    match &config.cors_allowed_origin {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .with_context(|| format!("invalid CORS_ALLOWED_ORIGIN '{origin}'"))?;
            Ok(layer.allow_origin(origin))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_accepts_configured_origin() {
        let config = AppConfig {
            cors_allowed_origin: Some("https://atlas.example".to_string()),
            ..AppConfig::default()
        };
        assert!(build_cors_layer(&config).is_ok());
    }

    #[test]
    fn test_cors_rejects_malformed_origin() {
        let config = AppConfig {
            cors_allowed_origin: Some("bad\norigin".to_string()),
            ..AppConfig::default()
        };
        assert!(build_cors_layer(&config).is_err());
    }
}
