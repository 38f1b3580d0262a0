use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use super::{ProgressReporter, Transfer, TransferState};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Collection of every [`Transfer`] created during a run.
///
/// Append-only: completed transfers are never pruned so they stay visible to
/// the final progress render and to aggregate queries. Linear scans are fine
/// at the scale of one season's episodes. Constructed once and shared by
/// `Arc` between the scheduler, the transfers and the progress reporter.
pub struct TransferRegistry {
    transfers: Mutex<Vec<Arc<Transfer>>>,
    /// Back-reference so `wait_all` can hand the reporter shared ownership.
    self_ref: Weak<TransferRegistry>,
}

impl TransferRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            transfers: Mutex::new(Vec::new()),
            self_ref: weak.clone(),
        })
    }

    pub(crate) fn register(&self, transfer: Arc<Transfer>) {
        self.transfers.lock().unwrap().push(transfer);
    }

    /// Whether any registered transfer targets `path`.
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.transfers
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.output_path() == path)
    }

    pub fn snapshot(&self) -> Vec<Arc<Transfer>> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.lock().unwrap().is_empty()
    }

    /// Number of transfers currently in the `Running` state.
    pub fn running_count(&self) -> usize {
        self.transfers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_running())
            .count()
    }

    /// Stops every running transfer, waiting for each to wind down. Used both
    /// as the error-path safety net and as orderly shutdown.
    pub async fn stop_all(&self) {
        for transfer in self.snapshot() {
            if transfer.state() == TransferState::Running {
                let _ = transfer.stop().await;
            }
        }
    }

    /// Blocks until every registered transfer is finished or no longer
    /// running, polling every 200ms and optionally rendering progress on each
    /// poll.
    pub async fn wait_all(&self, show_progress: bool) {
        let reporter = self.self_ref.upgrade().map(ProgressReporter::new);
        loop {
            if show_progress {
                if let Some(reporter) = &reporter {
                    let _ = reporter.render();
                }
            }
            let busy = self
                .snapshot()
                .iter()
                .any(|t| !t.is_finished() && t.is_running());
            if !busy {
                break;
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}
