//! `bookdl run` – download everything queued, mirroring lifecycle events
//! into the database.

use anyhow::{Context, Result};
use bookdl_core::config::{self, BookdlConfig};
use bookdl_core::resume_db::{ResumeDb, StoredState};
use bookdl_core::resume_store::MemoryResumeStore;
use bookdl_core::transport::curl::{CurlOptions, CurlTransport};
use bookdl_core::{
    CoordinatorConfig, CoordinatorDeps, DownloadCoordinator, DownloadEvent, DownloadId,
    DownloadRecord, DownloadStatus,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cli::control_socket;

const PROGRESS_INTERVAL_MS: u64 = 500;
/// How long Ctrl-C waits for transfers to hand back their resume data.
const INTERRUPT_GRACE: Duration = Duration::from_secs(10);

pub async fn run_queue(db: &ResumeDb, cfg: &BookdlConfig, jobs: Option<usize>) -> Result<()> {
    let recovered = db.recover_interrupted().await?;
    if recovered > 0 {
        tracing::info!("recovered {} download(s) from previous run", recovered);
    }

    let queued: Vec<_> = db
        .list_downloads()
        .await?
        .into_iter()
        .filter(|d| d.state == StoredState::Queued)
        .collect();
    if queued.is_empty() {
        println!("No queued downloads.");
        return Ok(());
    }

    let store = Arc::new(MemoryResumeStore::new());
    for (id, blob) in db.load_all_resume_data().await? {
        store.insert(DownloadId::from(id), blob);
    }

    let staging = cfg.staging_dir().context("locating staging directory")?;
    let transport = Arc::new(CurlTransport::new(staging, CurlOptions::from(cfg)));
    let mut coordinator_cfg = CoordinatorConfig::from_config(cfg)?;
    if let Some(n) = jobs {
        coordinator_cfg.capacity = n;
    }
    let deps = CoordinatorDeps::new(transport).with_resume_store(store.clone());
    let coordinator = DownloadCoordinator::spawn(coordinator_cfg, deps);
    let mut events = coordinator.subscribe();
    let mirror = Mirror { db, store: &store };

    for d in &queued {
        coordinator
            .append(DownloadRecord::with_id(d.download_id(), d.request.clone()))
            .await?;
    }

    let socket_path = config::control_socket_path()?;
    let listener =
        match control_socket::spawn_control_listener(coordinator.clone(), db.clone(), &socket_path)
        {
            Ok(handle) => {
                tracing::debug!(path = %socket_path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(path = %socket_path.display(), "control socket unavailable: {:#}", e);
                None
            }
        };

    let mut ticker = tokio::time::interval(Duration::from_millis(PROGRESS_INTERVAL_MS));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            Some(event) = events.recv() => mirror.apply(event).await,
            _ = ticker.tick() => {
                let records = coordinator.records().await?;
                print_progress(&records);
                if !records.iter().any(|r| r.status().is_active()) {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                println!("Interrupted; pausing active downloads...");
                interrupt(&coordinator, &mut events, &mirror).await?;
                break;
            }
        }
    }
    while let Ok(event) = events.try_recv() {
        mirror.apply(event).await;
    }

    let records = coordinator.records().await?;
    let _ = coordinator.shutdown().await;
    if let Some(handle) = listener {
        handle.abort();
        let _ = std::fs::remove_file(&socket_path);
    }

    let count = |f: fn(&DownloadStatus) -> bool| records.iter().filter(|r| f(r.status())).count();
    println!(
        "Finished {}, failed {}, paused {}.",
        count(DownloadStatus::is_finished),
        count(|s| s.failure().is_some()),
        count(|s| *s == DownloadStatus::Paused),
    );
    Ok(())
}

/// Stops admissions, pauses running transfers and waits (bounded) for their
/// resume data. Interrupted downloads go back to `queued` so the next run
/// picks them up.
async fn interrupt(
    coordinator: &DownloadCoordinator,
    events: &mut mpsc::UnboundedReceiver<DownloadEvent>,
    mirror: &Mirror<'_>,
) -> Result<()> {
    coordinator.set_capacity(0).await?;
    let mut pending = HashSet::new();
    for record in coordinator.records().await? {
        if *record.status() == DownloadStatus::Downloading {
            coordinator.pause(record.id()).await?;
            pending.insert(record.id().clone());
        }
    }
    let interrupted = pending.clone();

    let drained = tokio::time::timeout(INTERRUPT_GRACE, async {
        while !pending.is_empty() {
            let Some(event) = events.recv().await else {
                break;
            };
            if let DownloadEvent::CancelledWithResumeData { id, .. } = &event {
                pending.remove(id);
            }
            mirror.apply(event).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!("gave up waiting for {} transfer(s) to stop", pending.len());
    }

    for id in &interrupted {
        if let Some(row) = row_id(id) {
            mirror.db.set_state(row, StoredState::Queued, None).await?;
        }
    }
    Ok(())
}

fn print_progress(records: &[DownloadRecord]) {
    for r in records
        .iter()
        .filter(|r| *r.status() == DownloadStatus::Downloading)
    {
        println!(
            "  [{}] {:>5.1}%  {}",
            r.id(),
            r.progress().fraction() * 100.0,
            r.request().url
        );
    }
}

/// The CLI uses database row ids as download ids.
fn row_id(id: &DownloadId) -> Option<i64> {
    id.as_str().parse().ok()
}

/// Persists coordinator events: state, destination and resume data.
struct Mirror<'a> {
    db: &'a ResumeDb,
    store: &'a MemoryResumeStore,
}

impl Mirror<'_> {
    async fn apply(&self, event: DownloadEvent) {
        if let Err(e) = self.persist(event).await {
            tracing::warn!("could not record download event: {:#}", e);
        }
    }

    async fn persist(&self, event: DownloadEvent) -> Result<()> {
        match event {
            DownloadEvent::StatusChanged { id, status } => {
                let Some(row) = row_id(&id) else {
                    return Ok(());
                };
                let failure = status.failure().map(|f| f.to_string());
                self.db
                    .set_state(row, StoredState::from_status(&status), failure.as_deref())
                    .await?;
                if let Some(failure) = failure {
                    println!("Download {id} failed: {failure}");
                }
            }
            DownloadEvent::DownloadFinished { id, destination } => {
                let Some(row) = row_id(&id) else {
                    return Ok(());
                };
                self.db
                    .set_destination(row, &destination.display().to_string())
                    .await?;
                self.db.clear_resume_data(row).await?;
                self.store.remove(&id);
                println!("Download {id} finished: {}", destination.display());
            }
            DownloadEvent::CancelledWithResumeData {
                id,
                resume_data: Some(blob),
            } => {
                let Some(row) = row_id(&id) else {
                    return Ok(());
                };
                if self.db.save_resume_data(row, &blob).await? {
                    self.store.insert(id, blob);
                } else {
                    // Removed while running: nothing will resume from it.
                    CurlTransport::discard_resume_data(&blob)?;
                }
            }
            DownloadEvent::CancelledWithResumeData { .. }
            | DownloadEvent::QueueChanged(_)
            | DownloadEvent::TaskCreated { .. } => {}
        }
        Ok(())
    }
}
