use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::backend::NotifyBackend;
use super::{Notice, NoticeKind};

/// Slack incoming webhook notification backend.
pub struct SlackWebhook {
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            http: reqwest::Client::new(),
        }
    }

    fn kind_emoji(kind: NoticeKind) -> &'static str {
        match kind {
            NoticeKind::Ready => ":memo:",
            NoticeKind::Blocked => ":warning:",
            NoticeKind::Failed => ":rotating_light:",
        }
    }

    /// Message text: emoji headline, run id, then the report in a code block.
    pub fn format_text(notice: &Notice) -> String {
        format!(
            "{} *draftguard: {}*\n_Run {}_\n```{}```",
            Self::kind_emoji(notice.kind),
            notice.headline,
            notice.run_id,
            notice.report_text.trim(),
        )
    }

    async fn post(&self, payload: serde_json::Value) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Slack webhook returned non-success");
            anyhow::bail!("Slack webhook returned {status}");
        }

        Ok(())
    }
}

#[async_trait]
impl NotifyBackend for SlackWebhook {
    async fn send(&self, notice: &Notice) -> anyhow::Result<()> {
        let payload = json!({
            "text": Self::format_text(notice),
            "unfurl_links": false,
        });

        self.post(payload).await
    }
}
