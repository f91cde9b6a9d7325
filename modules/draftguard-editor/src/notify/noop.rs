use async_trait::async_trait;

use super::backend::NotifyBackend;
use super::Notice;

/// Backend used when no channel is configured.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn send(&self, _notice: &Notice) -> anyhow::Result<()> {
        Ok(())
    }
}
