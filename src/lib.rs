pub mod cli;
pub mod config;
pub mod download;
pub mod handlers;
pub mod resolver;
pub mod season;

// Re-export commonly used types for easier access in tests
pub use config::Config;
pub use download::{
    ProgressReporter, Scheduler, StartOutcome, StopOutcome, Transfer, TransferError,
    TransferRegistry, TransferState, WorkItem,
};
pub use resolver::{EpisodeLinks, SiteClient};
pub use season::{DownloadKey, Downloads, Episode, Season};
