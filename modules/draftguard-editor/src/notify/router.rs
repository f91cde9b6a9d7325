use async_trait::async_trait;
use tracing::warn;

use draftguard_common::Secrets;

use super::backend::NotifyBackend;
use super::slack::SlackWebhook;
use super::Notice;

/// Fans a notice out to every configured channel. Blocked and failed runs
/// go to the failure channels when any are configured. A channel that
/// errors is logged and skipped; the others are still attempted.
#[derive(Default)]
pub struct NotifyRouter {
    channels: Vec<Box<dyn NotifyBackend>>,
    failure_channels: Vec<Box<dyn NotifyBackend>>,
}

impl NotifyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, backend: Box<dyn NotifyBackend>) -> Self {
        self.channels.push(backend);
        self
    }

    pub fn with_failure_channel(mut self, backend: Box<dyn NotifyBackend>) -> Self {
        self.failure_channels.push(backend);
        self
    }

    /// Build a router from secrets.
    ///
    /// - `SLACK_WEBHOOK_URL`: default channel
    /// - `SLACK_WEBHOOK_URL_FAILURES`: override for blocked/failed runs (optional)
    pub fn from_secrets(secrets: &Secrets) -> Option<Self> {
        let default_url = secrets.slack_webhook_url.clone()?;
        let mut router = Self::new().with_channel(Box::new(SlackWebhook::new(default_url)));
        if let Some(failures_url) = secrets.slack_webhook_url_failures.clone() {
            router = router.with_failure_channel(Box::new(SlackWebhook::new(failures_url)));
        }
        Some(router)
    }

    fn route(&self, notice: &Notice) -> &[Box<dyn NotifyBackend>] {
        if notice.kind.is_failure() && !self.failure_channels.is_empty() {
            &self.failure_channels
        } else {
            &self.channels
        }
    }
}

#[async_trait]
impl NotifyBackend for NotifyRouter {
    async fn send(&self, notice: &Notice) -> anyhow::Result<()> {
        for (channel, backend) in self.route(notice).iter().enumerate() {
            if let Err(e) = backend.send(notice).await {
                warn!(error = %e, channel, kind = %notice.kind, "Failed to send notification");
            }
        }
        Ok(())
    }
}
