use crate::config::AppConfig;
use crate::repository::Repositories;
use crate::services::email::EmailProvider;

pub struct AppState {
    pub config: AppConfig,
    pub store: Repositories,
    pub email: Box<dyn EmailProvider>,
}
