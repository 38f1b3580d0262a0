use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2}\.[0-9]{1,2})").expect("valid rating regex"));

/// Metadata for one season of a series, as stored in the JSON files produced
/// by the `info` subcommand and consumed by `download`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    #[serde(rename = "series-name")]
    pub series_name: String,
    #[serde(rename = "season-number")]
    pub season_number: u32,
    pub episodes: Vec<Episode>,
}

impl Season {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not a valid season file", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write '{}'", path.display()))
    }

    /// Canonical file name for this season's metadata, e.g. `Doctor Who S02.json`.
    pub fn file_name(&self) -> String {
        format!("{} S{:02}.json", self.series_name, self.season_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Kept as a string to match the site's markup; see [`Episode::number`].
    #[serde(rename = "episode-number")]
    pub episode_number: String,
    pub title: String,
    #[serde(default)]
    pub info: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<Downloads>,
}

impl Episode {
    pub fn number(&self) -> Option<i64> {
        self.episode_number.trim().parse().ok()
    }

    /// Rating pulled out of the episode info line, `?` when absent.
    pub fn rating(&self) -> String {
        RATING_RE
            .captures(&self.info)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Destination file name: `<number>. <title> (<rating>)<ext>`.
    pub fn output_file_name(&self, key: DownloadKey) -> String {
        format!(
            "{}. {} ({}){}",
            self.episode_number,
            self.title,
            self.rating(),
            key.extension()
        )
    }
}

/// Per-episode download links, one per audio/subtitle flavor. Any of them may
/// be missing on the site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Downloads {
    #[serde(rename = "original-audio")]
    pub original_audio: Option<String>,
    #[serde(rename = "dubbed-audio")]
    pub dubbed_audio: Option<String>,
    pub subtitles: Option<String>,
}

/// Which download link of an episode to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DownloadKey {
    /// Dubbed audio video
    Dub,
    /// Original (english) audio video
    Eng,
    /// Subtitles file
    Sub,
}

impl DownloadKey {
    pub fn extension(self) -> &'static str {
        match self {
            DownloadKey::Dub | DownloadKey::Eng => ".mp4",
            DownloadKey::Sub => ".srt",
        }
    }

    pub fn select(self, downloads: &Downloads) -> Option<&str> {
        match self {
            DownloadKey::Dub => downloads.dubbed_audio.as_deref(),
            DownloadKey::Eng => downloads.original_audio.as_deref(),
            DownloadKey::Sub => downloads.subtitles.as_deref(),
        }
    }
}
