use anyhow::{Context, Result};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::resolver::SiteClient;
use crate::season::Downloads;

pub async fn handle_info(
    config: &Config,
    url: String,
    season: u32,
    output_dir: PathBuf,
) -> Result<()> {
    let term = Term::stdout();
    term.write_line(&format!(
        "{} Fetching episode list for season {}...",
        style("📺").cyan(),
        style(season).cyan().bold()
    ))?;

    let client = config.http_client()?;
    let site = SiteClient::new(client, &config.site.base_url);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap(),
    );
    spinner.set_message("Loading series page...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut season_data = site.season_episodes(&url, season).await?;

    spinner.finish_and_clear();
    term.write_line(&format!(
        "{} Found {} episodes of '{}'",
        style("✅").green(),
        style(season_data.episodes.len()).green().bold(),
        style(&season_data.series_name).cyan()
    ))?;

    // The links are time-limited, so resolve them all in one pass right away.
    for episode in &mut season_data.episodes {
        term.write_line(&format!(
            "   Resolving links for '{}. {}'...",
            episode.episode_number, episode.title
        ))?;
        let links = site.resolve_episode_links(&episode.id).await?;
        episode.downloads = Some(Downloads {
            original_audio: links.original_audio,
            dubbed_audio: links.dubbed_audio,
            subtitles: links.subtitles,
        });
    }

    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("failed to create output directory '{}'", output_dir.display())
    })?;
    let output_path = output_dir.join(season_data.file_name());
    season_data.save(&output_path)?;

    term.write_line(&format!(
        "{} Saved season metadata to {}",
        style("💾").cyan(),
        style(output_path.display()).cyan()
    ))?;

    Ok(())
}
