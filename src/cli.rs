use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::season::DownloadKey;

#[derive(Parser)]
#[command(name = "vizdl")]
#[command(about = "Fetch episode metadata and download episodes from streaming sites")]
#[command(long_about = "
vizdl gathers episode metadata and time-limited download links for a season of
a series, stores them as JSON, and downloads the files with resumable,
concurrency-bounded transfers and live progress reporting.

Examples:
  vizdl info --url https://vizertv.in/serie/online/doctor-who --season 2
  vizdl download --input 'Doctor Who S02.json' --key dub --output ~/Videos
  vizdl download --input season.json --key sub --start-from 7 --max-downloads 2
")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Gather info about all episodes from a season, including download links
    Info {
        /// URL of the series page
        #[arg(short, long, value_name = "URL")]
        url: String,

        /// Number of the desired season
        #[arg(short, long, value_name = "N")]
        season: u32,

        /// Directory the metadata JSON is written to
        #[arg(short, long, default_value = "output", value_name = "DIR")]
        output: PathBuf,
    },

    /// Download files based on previously gathered season metadata
    Download {
        /// Path to the JSON file containing the download data
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Which link to download: dubbed audio, original audio or subtitles
        #[arg(short, long, value_enum)]
        key: DownloadKey,

        /// Directory the files are saved under
        #[arg(short, long, default_value = ".", value_name = "DIR")]
        output: PathBuf,

        /// Number of the episode to start downloading from
        #[arg(long, default_value_t = 1, value_name = "N")]
        start_from: i64,

        /// Number of the episode to stop downloading at
        #[arg(long, value_name = "N")]
        stop_at: Option<i64>,

        /// Maximum number of concurrent downloads (defaults to the
        /// configured max_concurrent_downloads)
        #[arg(long, value_name = "N")]
        max_downloads: Option<usize>,
    },
}

impl Cli {
    /// Validate CLI arguments and show helpful error messages
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Commands::Info { url, season, .. } => {
                if url.is_empty() {
                    return Err("Series URL cannot be empty".to_string());
                }
                if *season == 0 {
                    return Err("Season number must be greater than 0".to_string());
                }
            }
            Commands::Download {
                start_from,
                stop_at,
                max_downloads,
                ..
            } => {
                if let Some(max_downloads) = max_downloads {
                    if *max_downloads == 0 || *max_downloads > 10 {
                        return Err(
                            "Max concurrent downloads must be between 1 and 10".to_string()
                        );
                    }
                }
                if *start_from < 1 {
                    return Err("Start episode must be at least 1".to_string());
                }
                if let Some(stop_at) = stop_at {
                    if stop_at < start_from {
                        return Err("Stop episode cannot be before the start episode".to_string());
                    }
                }
            }
        }
        Ok(())
    }
}
