use async_trait::async_trait;

use super::Notice;

/// Pluggable destination for run notices.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    async fn send(&self, notice: &Notice) -> anyhow::Result<()>;
}
