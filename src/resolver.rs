use anyhow::{bail, Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::season::{Episode, Season};

static DOWNLOAD_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.location\.href="[^"]*?(mixdrop[^"]+)""#).expect("valid target regex")
});

static SERIES_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<h2[^>]*>([^<]+)</h2>").expect("valid series name regex"));

static EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)data-episode-id="(?P<id>\d+)".*?class="tit"[^>]*>(?P<tit>[^<]+)<.*?class="info"[^>]*>(?P<info>[^<]*)<"#,
    )
    .expect("valid episode regex")
});

/// One entry of the site's `downloadData` ajax response. The entry carrying a
/// `sub` link is the original-audio variant, the other one is dubbed.
#[derive(Debug, Deserialize)]
struct DownloadEntry {
    redirector: String,
    #[serde(default)]
    sub: Option<String>,
}

/// Resolved download links for a single episode.
#[derive(Debug, Clone, Default)]
pub struct EpisodeLinks {
    pub original_audio: Option<String>,
    pub dubbed_audio: Option<String>,
    pub subtitles: Option<String>,
}

/// Thin HTTP client for the streaming site: episode listing, download-data
/// lookups and redirect-page resolution. No algorithmic depth here; the
/// output is `(url, output path)` material for the download core.
pub struct SiteClient {
    client: Client,
    base_url: String,
}

impl SiteClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// Fetches a series page and extracts the episode list from its markup.
    ///
    /// Best effort: only episodes present in the served page are visible.
    pub async fn season_episodes(&self, url: &str, season: u32) -> Result<Season> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch series page '{url}'"))?;
        if !response.status().is_success() {
            bail!(
                "unexpected status {} when fetching series page '{url}'",
                response.status()
            );
        }
        let html = response.text().await?;
        parse_season_page(&html, season)
            .with_context(|| format!("could not extract episodes from '{url}'"))
    }

    /// Looks up the redirect links and subtitle URL for an episode id.
    pub async fn episode_download_data(&self, episode_id: &str) -> Result<RawDownloadData> {
        let url = format!("{}/includes/ajax/publicFunctions.php", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[("downloadData", "2"), ("id", episode_id)])
            .send()
            .await
            .context("download data request failed")?;
        if !response.status().is_success() {
            bail!(
                "unexpected status {} when requesting download data for episode {episode_id}",
                response.status()
            );
        }
        let entries: HashMap<String, DownloadEntry> = response
            .json()
            .await
            .context("download data response was not the expected JSON shape")?;
        Ok(split_entries(entries))
    }

    /// Follows a redirect page and extracts the final file URL from it.
    pub async fn resolve_redirect(&self, redirect: Option<&str>) -> Result<Option<String>> {
        let Some(redirect) = redirect else {
            return Ok(None);
        };
        let url = format!("{}/{}", self.base_url, redirect.trim_start_matches('/'));
        debug!(url, "resolving redirect page");
        let html = self.client.get(&url).send().await?.text().await?;
        match extract_download_target(&html) {
            Some(target) => Ok(Some(target)),
            None => bail!("could not find a download on the given redirect link ({url})"),
        }
    }

    /// Full resolution for one episode: download data plus both redirects.
    pub async fn resolve_episode_links(&self, episode_id: &str) -> Result<EpisodeLinks> {
        let data = self.episode_download_data(episode_id).await?;
        let original_audio = self
            .resolve_redirect(data.original_audio_redirect.as_deref())
            .await?;
        let dubbed_audio = self
            .resolve_redirect(data.dubbed_audio_redirect.as_deref())
            .await?;
        Ok(EpisodeLinks {
            original_audio,
            dubbed_audio,
            subtitles: data.subtitles,
        })
    }
}

/// Redirect links straight out of the ajax response, before resolution.
#[derive(Debug, Clone, Default)]
pub struct RawDownloadData {
    pub original_audio_redirect: Option<String>,
    pub dubbed_audio_redirect: Option<String>,
    pub subtitles: Option<String>,
}

fn split_entries(entries: HashMap<String, DownloadEntry>) -> RawDownloadData {
    let mut data = RawDownloadData::default();
    for entry in entries.into_values() {
        if let Some(sub) = entry.sub {
            data.original_audio_redirect = Some(entry.redirector);
            data.subtitles = Some(sub);
        } else {
            data.dubbed_audio_redirect = Some(entry.redirector);
        }
    }
    data
}

fn extract_download_target(html: &str) -> Option<String> {
    DOWNLOAD_TARGET_RE
        .captures(html)
        .map(|c| format!("https://{}?download", &c[1]))
}

fn parse_season_page(html: &str, season: u32) -> Result<Season> {
    let series_name = SERIES_NAME_RE
        .captures(html)
        .map(|c| c[1].trim().to_string())
        .context("no series name found in page")?;

    let mut episodes = Vec::new();
    for capture in EPISODE_RE.captures_iter(html) {
        let title_string = capture["tit"].trim();
        // "<number>. <title>", same shape the site has always used
        let Some((number, title)) = title_string.split_once('.') else {
            continue;
        };
        episodes.push(Episode {
            episode_number: number.trim().to_string(),
            title: title.trim().to_string(),
            info: capture["info"].trim().to_string(),
            id: capture["id"].to_string(),
            downloads: None,
        });
    }
    if episodes.is_empty() {
        bail!("no episodes found in page markup");
    }

    Ok(Season {
        series_name,
        season_number: season,
        episodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_download_target() {
        let html = r#"<script>window.location.href="https://a.mixdrop.ag/f/abc123";</script>"#;
        assert_eq!(
            extract_download_target(html),
            Some("https://mixdrop.ag/f/abc123?download".to_string())
        );
        assert_eq!(extract_download_target("<html></html>"), None);
    }

    #[test]
    fn test_split_entries() {
        let mut entries = HashMap::new();
        entries.insert(
            "0".to_string(),
            DownloadEntry {
                redirector: "redirect/orig".to_string(),
                sub: Some("https://example.com/sub.srt".to_string()),
            },
        );
        entries.insert(
            "1".to_string(),
            DownloadEntry {
                redirector: "redirect/dub".to_string(),
                sub: None,
            },
        );

        let data = split_entries(entries);
        assert_eq!(data.original_audio_redirect.as_deref(), Some("redirect/orig"));
        assert_eq!(data.dubbed_audio_redirect.as_deref(), Some("redirect/dub"));
        assert_eq!(
            data.subtitles.as_deref(),
            Some("https://example.com/sub.srt")
        );
    }

    #[test]
    fn test_parse_season_page() {
        let html = r#"
            <h2>Doctor Who</h2>
            <div class="item" data-episode-id="100">
                <div class="tit">1. New Earth</div>
                <div class="info">45min 8.1/10</div>
            </div>
            <div class="item" data-episode-id="101">
                <div class="tit">2. Tooth and Claw</div>
                <div class="info">44min 7.9/10</div>
            </div>
        "#;

        let season = parse_season_page(html, 2).unwrap();
        assert_eq!(season.series_name, "Doctor Who");
        assert_eq!(season.season_number, 2);
        assert_eq!(season.episodes.len(), 2);
        assert_eq!(season.episodes[0].id, "100");
        assert_eq!(season.episodes[0].title, "New Earth");
        assert_eq!(season.episodes[1].episode_number, "2");
    }

    #[test]
    fn test_parse_season_page_without_episodes() {
        assert!(parse_season_page("<h2>Doctor Who</h2>", 1).is_err());
    }
}
