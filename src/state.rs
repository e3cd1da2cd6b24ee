use chrono::NaiveDate;

use crate::{
    auth::TokenService,
    config::AppConfig,
    db::DbPool,
    services::{google::GoogleVerifier, storage::StorageService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub storage: StorageService,
    pub tokens: TokenService,
    pub google: Option<GoogleVerifier>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        storage: StorageService,
        google: Option<GoogleVerifier>,
    ) -> Self {
        let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.jwt_ttl_hours);
        Self {
            config,
            db,
            storage,
            tokens,
            google,
        }
    }

    /// Today's date in the configured zone.
    pub fn today(&self) -> NaiveDate {
        chrono::Utc::now()
            .with_timezone(&self.config.timezone)
            .date_naive()
    }
}
