use async_trait::async_trait;
use tracing::debug;

/// Outbound mail channel. The reset flow depends on delivery errors being
/// reported, so implementations must not swallow them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()>;
}

/// Development mailer that writes messages to the log instead of SMTP.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()> {
        debug!(to = %to, name = %name, "welcome mail");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()> {
        debug!(to = %to, reset_url = %reset_url, "password reset mail");
        Ok(())
    }
}
