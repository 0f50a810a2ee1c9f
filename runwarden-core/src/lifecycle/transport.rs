use async_trait::async_trait;
use tracing::info;

use crate::{Result, lifecycle::composer::Notice};

/// Delivers rendered notices.
///
/// `Ok` means the notice left this process; only then is the matching
/// notice timestamp recorded.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NoticeTransport: Send + Sync {
    async fn send(&self, notice: &Notice) -> Result<()>;
}

/// Writes notices to the log instead of mailing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl NoticeTransport for LogTransport {
    async fn send(&self, notice: &Notice) -> Result<()> {
        info!(
            stage = %notice.stage,
            recipient = %notice.recipient,
            subject = %notice.subject,
            runs = notice.run_ids.len(),
            "notice\n{}",
            notice.body
        );
        Ok(())
    }
}
