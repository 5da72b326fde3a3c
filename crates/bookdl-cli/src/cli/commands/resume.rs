//! `bookdl resume <id>` – queue a paused or failed download again.

use anyhow::{bail, Result};
use bookdl_core::resume_db::{ResumeDb, StoredState};

use crate::cli::control_socket::{self, ControlCommand};

pub async fn run_resume(db: &ResumeDb, id: i64) -> Result<()> {
    let Some(download) = db.get_download(id).await? else {
        bail!("no download with id {id}");
    };
    if download.state == StoredState::Finished {
        println!("Download {id} already finished");
        return Ok(());
    }
    db.set_state(id, StoredState::Queued, None).await?;
    control_socket::notify(ControlCommand::Resume(id)).await;
    println!("Resumed download {id}");
    Ok(())
}
