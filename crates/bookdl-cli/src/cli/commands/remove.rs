//! `bookdl remove <id>` – remove a download; `--delete-files` also deletes
//! the finished file and any partial data.

use anyhow::{bail, Result};
use bookdl_core::resume_db::ResumeDb;
use bookdl_core::transport::curl::CurlTransport;

use crate::cli::control_socket::{self, ControlCommand};

pub async fn run_remove(db: &ResumeDb, id: i64, delete_files: bool) -> Result<()> {
    let Some(download) = db.get_download(id).await? else {
        bail!("no download with id {id}");
    };

    control_socket::notify(ControlCommand::Remove(id)).await;

    if delete_files {
        if let Some(dest) = &download.destination {
            match tokio::fs::remove_file(dest).await {
                Ok(()) => tracing::debug!(path = %dest, "deleted file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %dest, "could not delete file: {}", e),
            }
        }
        if let Some(blob) = db.load_resume_data(id).await? {
            if let Err(e) = CurlTransport::discard_resume_data(&blob) {
                tracing::warn!(id, "could not delete partial data: {}", e);
            }
        }
    }

    db.remove_download(id).await?;
    println!("Removed download {id}");
    Ok(())
}
