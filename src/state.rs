use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::auth::session::SessionManager;
use crate::auth::store::{CredentialStore, PgCredentialStore};
use crate::auth::tokens::JwtKeys;
use crate::config::AppConfig;
use crate::mail::{LogMailer, Mailer};
use crate::visits::{PgVisitRecorder, VisitRecorder};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CredentialStore>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let store = Arc::new(PgCredentialStore::new(db.clone())) as Arc<dyn CredentialStore>;
        let visits = Arc::new(PgVisitRecorder::new(db.clone())) as Arc<dyn VisitRecorder>;
        let mailer = Arc::new(LogMailer) as Arc<dyn Mailer>;
        let keys = JwtKeys::new(&config.jwt);
        let sessions = Arc::new(SessionManager::new(store.clone(), keys, visits, mailer));

        Ok(Self {
            db,
            config,
            store,
            sessions,
        })
    }
}
