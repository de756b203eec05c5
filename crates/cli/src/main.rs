use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use mediasort_cli::commands;
use mediasort_core::config::{self, Credentials};
use mediasort_core::MediaKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Organize { directory, kind, json } => {
            let creds = Credentials::from_env()?;
            let summary = commands::organize(&cfg, &creds, &directory, kind).await?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "iterations": summary.iterations,
                        "moved": summary.moved,
                        "marked": summary.marked,
                        "folders_finished": summary.folders_finished,
                    })
                );
            } else {
                println!(
                    "No more files to process! {} iterations, {} moved, {} marked, {} folders finished.",
                    summary.iterations, summary.moved, summary.marked, summary.folders_finished
                );
            }
            Ok(())
        }
        Commands::Hash { folder } => {
            let path = commands::hash_folder(&folder)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Verify { folder } => {
            let report = commands::verify_folder(&folder)?;
            println!("matched: {}", report.matched);
            for key in &report.mismatched {
                println!("changed: {}", key);
            }
            for key in &report.missing {
                println!("missing: {}", key);
            }
            for key in &report.unexpected {
                println!("unexpected: {}", key);
            }
            if !report.is_clean() {
                bail!("{} does not match its manifest", folder.display());
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "mediasort")]
#[command(about = "Agent-driven media library organizer", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Organize a directory of movies, TV episodes or audiobooks
    Organize {
        /// Directory to organize; must already exist
        directory: PathBuf,
        /// Media type: movie, tv or audiobook
        kind: MediaKind,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Write a content manifest for a folder, marking it finished
    Hash { folder: PathBuf },
    /// Check a finished folder against its manifest
    Verify { folder: PathBuf },
}
