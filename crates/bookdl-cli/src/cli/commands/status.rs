//! `bookdl status` – show every download.

use anyhow::Result;
use bookdl_core::resume_db::ResumeDb;

pub async fn run_status(db: &ResumeDb) -> Result<()> {
    let downloads = db.list_downloads().await?;
    if downloads.is_empty() {
        println!("No downloads in database.");
        return Ok(());
    }
    println!("{:<6} {:<12} {}", "ID", "STATE", "URL");
    for d in downloads {
        println!("{:<6} {:<12} {}", d.id, d.state.as_str(), d.request.url);
        if let Some(dest) = &d.destination {
            println!("{:<6} {:<12} -> {}", "", "", dest);
        }
        if let Some(failure) = &d.failure {
            println!("{:<6} {:<12} !! {}", "", "", failure);
        }
    }
    Ok(())
}
