pub mod progress;
pub mod registry;
pub mod scheduler;
pub mod transfer;

pub use progress::ProgressReporter;
pub use registry::TransferRegistry;
pub use scheduler::{Scheduler, WorkItem};
pub use transfer::Transfer;

use std::path::PathBuf;
use thiserror::Error;

/// Fatal transfer errors. Any of these raised during construction also stops
/// every other in-flight transfer before surfacing to the caller.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid transfer input: {0}")]
    InvalidInput(String),

    #[error("another transfer is already writing to '{}'", .0.display())]
    DuplicatePath(PathBuf),

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lifecycle of a single transfer. `Stopped` is terminal: a fresh `Transfer`
/// against the same path resumes from whatever was flushed to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Running,
    Completed,
    Stopped,
}

/// Advisory outcome of `Transfer::start`. Anything but `Started` is a no-op
/// that was already reported through a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum StartOutcome {
    Started,
    AlreadyFinished,
    AlreadyRunning,
}

/// Advisory outcome of `Transfer::stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum StopOutcome {
    Stopped,
    /// The transfer drained its stream before observing the cancel flag.
    Completed,
    NotRunning,
}
