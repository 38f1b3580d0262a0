use anyhow::{Context, Result};
use console::{style, Term};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::download::{ProgressReporter, Scheduler, TransferRegistry, WorkItem};
use crate::season::{DownloadKey, Season};

const RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// The CLI flag wins; without it the configured value applies.
fn effective_max_downloads(config: &Config, cli_override: Option<usize>) -> usize {
    cli_override.unwrap_or(config.general.max_concurrent_downloads)
}

pub async fn handle_download(
    config: &Config,
    input: PathBuf,
    key: DownloadKey,
    output: PathBuf,
    start_from: i64,
    stop_at: Option<i64>,
    max_downloads: Option<usize>,
) -> Result<()> {
    let term = Term::stdout();
    let max_downloads = effective_max_downloads(config, max_downloads);
    let season = Season::load(&input)?;

    // The core never creates directories, so the target tree is built here.
    let target_dir = output
        .join(&season.series_name)
        .join(format!("Temporada {}", season.season_number));
    std::fs::create_dir_all(&target_dir).with_context(|| {
        format!("failed to create output directory '{}'", target_dir.display())
    })?;

    let mut items = Vec::new();
    for episode in &season.episodes {
        let Some(number) = episode.number() else {
            warn!(
                episode = %episode.episode_number,
                "episode has a non-numeric number, skipping"
            );
            continue;
        };
        if number < start_from {
            continue;
        }
        if stop_at.is_some_and(|stop| number > stop) {
            break;
        }

        let Some(url) = episode.downloads.as_ref().and_then(|d| key.select(d)) else {
            warn!(
                episode = %episode.episode_number,
                title = %episode.title,
                "no download link for the requested key, skipping"
            );
            continue;
        };

        items.push(WorkItem {
            url: url.to_string(),
            output_path: target_dir.join(episode.output_file_name(key)),
        });
    }

    if items.is_empty() {
        term.write_line(&format!(
            "{} Nothing to download for '{}'",
            style("ℹ️").cyan(),
            style(&season.series_name).cyan()
        ))?;
        return Ok(());
    }

    term.write_line(&format!(
        "{} Downloading {} files to {} (max {} concurrent)",
        style("⬇️").cyan(),
        style(items.len()).cyan().bold(),
        style(target_dir.display()).cyan(),
        max_downloads
    ))?;

    let registry = TransferRegistry::new();
    let client = config.http_client()?;
    let scheduler = Scheduler::new(Arc::clone(&registry), client, max_downloads);
    let reporter = Arc::new(ProgressReporter::new(Arc::clone(&registry)));

    let render_task = Arc::clone(&reporter).spawn(RENDER_INTERVAL);
    let result = scheduler.run(items).await;
    registry.wait_all(false).await;
    render_task.abort();
    // one last frame so the final percentages stay on screen
    let _ = reporter.render();
    result?;

    term.write_line(&format!("{} All downloads finished", style("✅").green()))?;
    Ok(())
}
