//! `bookdl pause <id>` – pause a download. If `bookdl run` is active, it
//! stops the transfer and stores the resume data.

use anyhow::{bail, Result};
use bookdl_core::resume_db::{ResumeDb, StoredState};

use crate::cli::control_socket::{self, ControlCommand};

pub async fn run_pause(db: &ResumeDb, id: i64) -> Result<()> {
    let Some(download) = db.get_download(id).await? else {
        bail!("no download with id {id}");
    };
    if download.state == StoredState::Finished {
        println!("Download {id} already finished");
        return Ok(());
    }
    control_socket::notify(ControlCommand::Pause(id)).await;
    db.set_state(id, StoredState::Paused, None).await?;
    println!("Paused download {id}");
    Ok(())
}
