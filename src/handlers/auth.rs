use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use constant_time_eq::constant_time_eq;

use crate::errors::AppError;
use crate::state::AppState;

/// Checks `Authorization: Bearer <token>` against the configured admin token.
/// An empty configured token rejects everything.
pub fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    if expected_token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if !constant_time_eq(token.as_bytes(), expected_token.as_bytes()) {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

/// Extractor guarding admin routes. Rejects before the handler body runs.
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        check_auth(&parts.headers, &state.config.admin_token).map_err(|e| {
            tracing::warn!(path = %parts.uri.path(), "rejected admin request");
            e
        })?;
        Ok(AdminAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_accepts_matching_bearer() {
        assert!(check_auth(&headers("Bearer s3cret"), "s3cret").is_ok());
    }

    #[test]
    fn test_rejects_wrong_or_missing_token() {
        assert!(matches!(check_auth(&headers("Bearer nope"), "s3cret"), Err(AppError::Unauthorized)));
        assert!(matches!(check_auth(&headers("s3cret"), "s3cret"), Err(AppError::Unauthorized)));
        assert!(matches!(check_auth(&HeaderMap::new(), "s3cret"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_unconfigured_token_rejects_everything() {
        assert!(matches!(check_auth(&headers("Bearer "), ""), Err(AppError::Unauthorized)));
        assert!(matches!(check_auth(&HeaderMap::new(), ""), Err(AppError::Unauthorized)));
    }
}
