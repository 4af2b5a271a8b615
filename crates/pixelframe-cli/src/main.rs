//! Pixelframe CLI: upload media files through the batch uploader.
//!
//! Configuration comes from `--config <file>` or the environment
//! (PIXELFRAME_CONFIG plus PIXELFRAME_* overrides). Events are printed to
//! stdout as JSON lines.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pixelframe_cli::{event_line, init_tracing, read_selection};
use pixelframe_core::{UploaderConfig, UploaderEvent};
use pixelframe_processing::ValidationPolicy;
use pixelframe_uploader::Uploader;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "pixelframe", about = "Pixelframe media uploader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and upload one selection of files
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// JSON config file (defaults to the environment)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Probe files one at a time instead of concurrently
        #[arg(long)]
        sequential: bool,
    },
    /// List the event names the uploader emits
    Events,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<UploaderConfig> {
    match path {
        Some(path) => UploaderConfig::from_file(path),
        None => UploaderConfig::from_env(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            files,
            config,
            sequential,
        } => {
            let config = load_config(config).context("Failed to load uploader config")?;
            let policy = if sequential {
                ValidationPolicy::Sequential
            } else {
                ValidationPolicy::Parallel
            };
            let selection = read_selection(&files, &config).await?;

            let uploader = Uploader::from_config(config, policy).await?;
            let mut rx = uploader.subscribe();

            let printer = tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => {
                            println!("{}", event_line(&event)?);
                            if matches!(event, UploaderEvent::Done { .. }) {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Event printer fell behind");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                Ok::<(), anyhow::Error>(())
            });

            let handle = uploader.pass_files(selection).await;
            let results = match handle {
                Some(handle) => Some(handle.wait().await),
                None => None,
            };
            // Closes the event channel once the printer has drained it.
            drop(uploader);
            printer.await.context("Event printer task failed")??;

            let results = results.context("No file was accepted")?;
            let failed = results.iter().filter(|r| r.error.is_some()).count();
            if failed > 0 {
                anyhow::bail!("{} of {} uploads failed", failed, results.len());
            }
        }
        Commands::Events => {
            for name in UploaderEvent::supported_events() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
