use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{Transfer, TransferError, TransferRegistry};

const ADMISSION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One pending download: where to fetch from and where to write.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub url: String,
    pub output_path: PathBuf,
}

/// Admission-controlled orchestration over an ordered sequence of work items.
///
/// Each item waits until the registry's running count drops below the
/// configured cap, then a transfer is constructed and started for it. A
/// construction failure propagates after the registry has already stopped
/// every sibling transfer; files on disk are left as-is.
pub struct Scheduler {
    registry: Arc<TransferRegistry>,
    client: Client,
    max_concurrent: usize,
}

impl Scheduler {
    pub fn new(registry: Arc<TransferRegistry>, client: Client, max_concurrent: usize) -> Self {
        Self {
            registry,
            client,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<TransferRegistry> {
        &self.registry
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub async fn run(
        &self,
        items: impl IntoIterator<Item = WorkItem>,
    ) -> Result<(), TransferError> {
        for item in items {
            while self.registry.running_count() >= self.max_concurrent {
                tokio::time::sleep(ADMISSION_POLL_INTERVAL).await;
            }

            debug!(url = %item.url, path = %item.output_path.display(), "admitting transfer");
            let transfer =
                Transfer::new(&self.registry, &self.client, &item.url, item.output_path, None)
                    .await?;
            let _ = transfer.start();
        }
        Ok(())
    }
}
