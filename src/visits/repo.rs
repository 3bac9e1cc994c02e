use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{VisitInfo, VisitRecorder};

pub struct PgVisitRecorder {
    db: PgPool,
}

impl PgVisitRecorder {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VisitRecorder for PgVisitRecorder {
    async fn record(&self, user_id: Uuid, visit: &VisitInfo) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO user_visits (user_id, ip_address, user_agent, device_type) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(&visit.ip_address)
        .bind(&visit.user_agent)
        .bind(&visit.device_type)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
