use axum::async_trait;
use uuid::Uuid;

pub mod repo;
pub mod ua;

pub use repo::PgVisitRecorder;

/// Normalized device/IP metadata for one successful user login.
#[derive(Debug, Clone)]
pub struct VisitInfo {
    pub ip_address: String,
    pub device_type: String,
    pub user_agent: String,
}

/// Sink for login visit records. Callers treat it as fire-and-forget:
/// failures are logged, never surfaced to the login.
#[async_trait]
pub trait VisitRecorder: Send + Sync {
    async fn record(&self, user_id: Uuid, visit: &VisitInfo) -> anyhow::Result<()>;
}
