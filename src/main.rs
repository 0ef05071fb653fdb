use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use homeservices::config::{AppConfig, EmailProviderKind};
use homeservices::repository::Repositories;
use homeservices::router;
use homeservices::services::email;
use homeservices::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    match config.email_provider {
        EmailProviderKind::Resend | EmailProviderKind::SendGrid => anyhow::ensure!(
            !config.email_api_key.is_empty(),
            "EMAIL_API_KEY must be set when EMAIL_PROVIDER is resend or sendgrid"
        ),
        EmailProviderKind::Smtp => anyhow::ensure!(
            config.smtp_host.is_some(),
            "SMTP_HOST must be set when EMAIL_PROVIDER is smtp"
        ),
        EmailProviderKind::Disabled => {}
    }
    if config.admin_token.is_empty() {
        tracing::warn!("ADMIN_TOKEN is not set, admin API will reject every request");
    }

    let store = Repositories::from_config(&config)?;
    let email = email::provider_from_config(&config)?;

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        email,
    });

    let app = router::app(state)?;

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
