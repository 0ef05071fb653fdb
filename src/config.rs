use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailProviderKind {
    Resend,
    SendGrid,
    Smtp,
    Disabled,
}

/// STARTTLS submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub storage_backend: StorageBackend,
    /// Shared secret for the admin API. Empty disables every admin route.
    pub admin_token: String,
    pub email_provider: EmailProviderKind,
    pub email_api_key: String,
    pub email_api_url: Option<String>,
    pub email_from: String,
    pub email_timeout_secs: u64,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    /// Credentials are sent only when both are set.
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Receives a copy of every new booking when set.
    pub admin_email: Option<String>,
    pub public_base_url: String,
    pub cors_allowed_origin: Option<String>,
    pub auto_publish_reviews: bool,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "homeservices.db".to_string()),
            storage_backend: match env::var("STORAGE_BACKEND").as_deref() {
                Ok("memory") => StorageBackend::Memory,
                _ => StorageBackend::Sqlite,
            },
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_default(),
            email_provider: match env::var("EMAIL_PROVIDER").as_deref() {
                Ok("resend") => EmailProviderKind::Resend,
                Ok("sendgrid") => EmailProviderKind::SendGrid,
                Ok("smtp") => EmailProviderKind::Smtp,
                _ => EmailProviderKind::Disabled,
            },
            email_api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
            email_api_url: non_empty("EMAIL_API_URL"),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@atlashomeservices.com".to_string()),
            email_timeout_secs: env::var("EMAIL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            smtp_host: non_empty("SMTP_HOST"),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: non_empty("SMTP_USER"),
            smtp_password: non_empty("SMTP_PASSWORD"),
            admin_email: non_empty("ADMIN_EMAIL"),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            cors_allowed_origin: non_empty("CORS_ALLOWED_ORIGIN"),
            auto_publish_reviews: env::var("AUTO_PUBLISH_REVIEWS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "homeservices.db".to_string(),
            storage_backend: StorageBackend::Sqlite,
            admin_token: String::new(),
            email_provider: EmailProviderKind::Disabled,
            email_api_key: String::new(),
            email_api_url: None,
            email_from: "noreply@atlashomeservices.com".to_string(),
            email_timeout_secs: 10,
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            admin_email: None,
            public_base_url: "http://localhost:3000".to_string(),
            cors_allowed_origin: None,
            auto_publish_reviews: false,
        }
    }
}
