use axum::async_trait;
use tracing::info;

/// Outbound mail contract. Delivery itself happens in an external service;
/// the core only hands over the recipient and the secret material.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset_link(&self, email: &str, token: &str) -> anyhow::Result<()>;
    async fn send_otp_email(&self, email: &str, code: &str) -> anyhow::Result<()>;
}

/// Mailer that records deliveries in the log stream instead of sending.
/// Stands in wherever no real mail relay is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset_link(&self, email: &str, token: &str) -> anyhow::Result<()> {
        info!(email = %email, token_len = token.len(), "password reset link issued");
        Ok(())
    }

    async fn send_otp_email(&self, email: &str, code: &str) -> anyhow::Result<()> {
        info!(email = %email, code_len = code.len(), "otp email issued");
        Ok(())
    }
}
