//! Outbound mail seam.
//!
//! Actual delivery is an external integration; the server only needs a
//! place to hand the verification link to.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// Logs outgoing mail instead of delivering it. Keeps signup usable when no
/// mail integration is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        info!("Mail to {} [{}]: {}", to, subject, html_body);
        Ok(())
    }
}
