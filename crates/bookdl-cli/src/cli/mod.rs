//! CLI for the bookdl download queue.

mod commands;
mod control_socket;

use anyhow::Result;
use bookdl_core::config;
use bookdl_core::resume_db::ResumeDb;
use clap::{Parser, Subcommand};

use commands::{run_add, run_pause, run_queue, run_remove, run_resume, run_status};

/// Top-level CLI for the bookdl download queue.
#[derive(Debug, Parser)]
#[command(name = "bookdl")]
#[command(about = "bookdl: queue and fetch books with pause and resume", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue a new download.
    Add {
        /// HTTP/HTTPS URL of the book.
        url: String,
        /// Extra request header, e.g. "Authorization: Bearer abc". Repeatable.
        #[arg(long = "header", short = 'H', value_name = "NAME: VALUE", value_parser = commands::parse_header)]
        headers: Vec<(String, String)>,
    },

    /// Download everything queued, then exit.
    Run {
        /// Maximum simultaneous downloads (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Show every download and its state.
    Status,

    /// Pause a download. A running `bookdl run` stops it and keeps the partial data.
    Pause {
        /// Download identifier.
        id: i64,
    },

    /// Queue a paused or failed download again.
    Resume {
        /// Download identifier.
        id: i64,
    },

    /// Remove a download from the queue.
    Remove {
        /// Download identifier.
        id: i64,
        /// Also delete the downloaded file and any partial data.
        #[arg(long)]
        delete_files: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = ResumeDb::open_default().await?;

        match cli.command {
            CliCommand::Add { url, headers } => run_add(&db, &url, headers).await?,
            CliCommand::Run { jobs } => run_queue(&db, &cfg, jobs).await?,
            CliCommand::Status => run_status(&db).await?,
            CliCommand::Pause { id } => run_pause(&db, id).await?,
            CliCommand::Resume { id } => run_resume(&db, id).await?,
            CliCommand::Remove { id, delete_files } => run_remove(&db, id, delete_files).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
