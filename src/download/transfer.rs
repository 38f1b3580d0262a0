use futures_util::StreamExt;
use reqwest::header::{HeaderMap, RANGE};
use reqwest::{Client, Response, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use super::{StartOutcome, StopOutcome, TransferError, TransferRegistry, TransferState};

/// One resumable, range-aware HTTP-to-file download.
///
/// A transfer is constructed against a URL and a destination path, probing the
/// server for the resource size and seeding its byte counter from whatever is
/// already on disk. The actual streaming happens on a background task spawned
/// by [`Transfer::start`]; readers (the progress reporter, the scheduler) see
/// its counters through atomics without blocking the writer.
pub struct Transfer {
    source_url: String,
    output_path: PathBuf,
    file_name: String,
    /// 0 means the server never reported a length.
    total_size: AtomicU64,
    written_bytes: AtomicU64,
    cancel: AtomicBool,
    state_tx: watch::Sender<TransferState>,
    /// The streamed response prepared by the constructor, consumed by `start`.
    response: Mutex<Option<Response>>,
}

impl Transfer {
    /// Probes `url`, prepares the ranged fetch and registers the transfer.
    ///
    /// Fails with [`TransferError::InvalidInput`] for a malformed URL, with
    /// [`TransferError::DuplicatePath`] when another registered transfer
    /// already targets `output_path`, and with
    /// [`TransferError::UnexpectedStatus`] when either request answers with
    /// anything outside 200/206. Every fatal error here stops all other
    /// in-flight transfers before returning: a bad construction argument means
    /// the caller is about to abort and nothing should keep writing.
    pub async fn new(
        registry: &Arc<TransferRegistry>,
        client: &Client,
        url: &str,
        output_path: impl Into<PathBuf>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Arc<Self>, TransferError> {
        let output_path = output_path.into();

        if let Err(e) = Url::parse(url) {
            registry.stop_all().await;
            return Err(TransferError::InvalidInput(format!(
                "'{url}' is not a valid URL: {e}"
            )));
        }

        if registry.is_claimed(&output_path) {
            registry.stop_all().await;
            return Err(TransferError::DuplicatePath(output_path));
        }

        let extra_headers = extra_headers.unwrap_or_default();

        // Probe for the resource size before the real fetch.
        let probe = match client.get(url).headers(extra_headers.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                registry.stop_all().await;
                return Err(e.into());
            }
        };
        let status = probe.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            registry.stop_all().await;
            return Err(TransferError::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }
        let total_size = probe.content_length().unwrap_or(0);
        if total_size == 0 {
            warn!(
                url,
                "server did not report a content length; resume and percentage progress are best effort"
            );
        }
        drop(probe);

        // Bytes already on disk are the resume point.
        let written_bytes = match tokio::fs::metadata(&output_path).await {
            Ok(metadata) => metadata.len(),
            Err(_) => 0,
        };

        let file_name = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| output_path.display().to_string());

        let (state_tx, _) = watch::channel(TransferState::Idle);
        let transfer = Arc::new(Self {
            source_url: url.to_string(),
            output_path,
            file_name,
            total_size: AtomicU64::new(total_size),
            written_bytes: AtomicU64::new(written_bytes),
            cancel: AtomicBool::new(false),
            state_tx,
            response: Mutex::new(None),
        });

        if total_size > 0 && written_bytes == total_size {
            // Nothing left to fetch; no second request is issued.
            debug!(file = %transfer.file_name, "file already complete on disk");
            transfer.state_tx.send_replace(TransferState::Completed);
        } else {
            let mut request = client.get(url).headers(extra_headers);
            if written_bytes > 0 {
                request = request.header(RANGE, format!("bytes={written_bytes}-"));
            }
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    registry.stop_all().await;
                    return Err(e.into());
                }
            };
            let status = response.status();
            if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
                registry.stop_all().await;
                return Err(TransferError::UnexpectedStatus {
                    status,
                    url: url.to_string(),
                });
            }
            *transfer.response.lock().unwrap() = Some(response);
        }

        registry.register(Arc::clone(&transfer));
        Ok(transfer)
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Base name of the destination file, used for progress lines.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `None` until the server (or an exhausted stream) reveals the length.
    pub fn total_size(&self) -> Option<u64> {
        match self.total_size.load(Ordering::Relaxed) {
            0 => None,
            size => Some(size),
        }
    }

    pub fn written_bytes(&self) -> u64 {
        self.written_bytes.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> TransferState {
        *self.state_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == TransferState::Running
    }

    /// Percentage completed, defined only when the total size is known.
    pub fn progress(&self) -> Option<f64> {
        let total = self.total_size.load(Ordering::Relaxed);
        if total == 0 {
            return None;
        }
        Some(self.written_bytes.load(Ordering::Relaxed) as f64 / total as f64 * 100.0)
    }

    pub fn is_finished(&self) -> bool {
        self.progress().is_some_and(|p| p >= 100.0)
    }

    /// Spawns the background task streaming the response body to disk.
    ///
    /// Refuses (with a warning, no state change) when the transfer is already
    /// finished or already running.
    pub fn start(self: &Arc<Self>) -> StartOutcome {
        if self.is_finished() {
            warn!(file = %self.file_name, "can't start a transfer that's already finished");
            return StartOutcome::AlreadyFinished;
        }
        match self.state() {
            TransferState::Running => {
                warn!(file = %self.file_name, "can't start a transfer that's already running");
                return StartOutcome::AlreadyRunning;
            }
            TransferState::Completed | TransferState::Stopped => {
                warn!(file = %self.file_name, "can't start a transfer that already ran");
                return StartOutcome::AlreadyFinished;
            }
            TransferState::Idle => {}
        }
        let Some(response) = self.response.lock().unwrap().take() else {
            warn!(file = %self.file_name, "transfer has no response stream left to read");
            return StartOutcome::AlreadyFinished;
        };

        // Flip to Running before spawning so admission checks never see a
        // started transfer as idle.
        self.state_tx.send_replace(TransferState::Running);
        let transfer = Arc::clone(self);
        tokio::spawn(async move {
            transfer.run(response).await;
        });
        StartOutcome::Started
    }

    /// Requests cancellation and waits until the background task has exited.
    ///
    /// When this returns the output file is closed and `written_bytes`
    /// matches what is on disk. No-op with a warning when not running; the
    /// outcome reflects the state the task actually ended in, since it may
    /// drain the stream naturally before ever observing the cancel flag.
    pub async fn stop(&self) -> StopOutcome {
        let mut state_rx = self.state_tx.subscribe();
        if *state_rx.borrow_and_update() != TransferState::Running {
            warn!(file = %self.file_name, "can't stop a transfer that's not running");
            return StopOutcome::NotRunning;
        }
        self.cancel.store(true, Ordering::SeqCst);
        while *state_rx.borrow_and_update() == TransferState::Running {
            if state_rx.changed().await.is_err() {
                break;
            }
        }
        self.cancel.store(false, Ordering::SeqCst);
        let outcome = match *state_rx.borrow() {
            TransferState::Completed => StopOutcome::Completed,
            _ => StopOutcome::Stopped,
        };
        outcome
    }

    async fn run(&self, response: Response) {
        let final_state = match self.pump(response).await {
            Ok(state) => state,
            Err(e) => {
                // No retry: the transfer keeps whatever bytes were flushed
                // and a fresh construction against the same path resumes.
                error!(file = %self.file_name, error = %e, "transfer failed");
                self.resync_written().await;
                TransferState::Stopped
            }
        };
        self.cancel.store(false, Ordering::SeqCst);
        self.state_tx.send_replace(final_state);
    }

    async fn pump(&self, response: Response) -> Result<TransferState, TransferError> {
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.output_path)
            .await?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !chunk.is_empty() {
                file.write_all(&chunk).await?;
                self.written_bytes
                    .fetch_add(chunk.len() as u64, Ordering::Relaxed);
            }

            // Cancellation is only observed at chunk boundaries.
            if self.cancel.load(Ordering::SeqCst) {
                file.flush().await?;
                self.resync_written().await;
                return Ok(TransferState::Stopped);
            }
        }
        file.flush().await?;

        if self.total_size.load(Ordering::Relaxed) == 0 {
            // The exhausted stream finally fixes the length.
            self.total_size.store(
                self.written_bytes.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
        Ok(TransferState::Completed)
    }

    /// The file on disk is the authoritative byte count after an interrupted
    /// or failed write.
    async fn resync_written(&self) {
        if let Ok(metadata) = tokio::fs::metadata(&self.output_path).await {
            self.written_bytes.store(metadata.len(), Ordering::SeqCst);
        }
    }
}
