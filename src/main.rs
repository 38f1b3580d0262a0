use anyhow::Result;
use clap::Parser;
use std::process;

use vizdl::cli::{Cli, Commands};
use vizdl::config::Config;
use vizdl::handlers;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Validate CLI arguments first
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    // Initialize logging based on verbosity
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .init();
    }

    let config = Config::load()?;

    match args.command {
        Commands::Info {
            url,
            season,
            output,
        } => {
            handlers::handle_info(&config, url, season, output).await?;
        }
        Commands::Download {
            input,
            key,
            output,
            start_from,
            stop_at,
            max_downloads,
        } => {
            handlers::handle_download(
                &config,
                input,
                key,
                output,
                start_from,
                stop_at,
                max_downloads,
            )
            .await?;
        }
    }

    Ok(())
}
