//! Control socket: server (during `bookdl run`) and client (for `bookdl
//! pause|resume|remove`). One line per command: "pause <id>",
//! "resume <id>" or "remove <id>".

use anyhow::Result;
use bookdl_core::config;
use bookdl_core::resume_db::ResumeDb;
use bookdl_core::{DownloadCoordinator, DownloadId, DownloadRecord};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause(i64),
    Resume(i64),
    Remove(i64),
}

impl ControlCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let (verb, id) = line.trim().split_once(' ')?;
        let id = id.trim().parse::<i64>().ok()?;
        match verb {
            "pause" => Some(Self::Pause(id)),
            "resume" => Some(Self::Resume(id)),
            "remove" => Some(Self::Remove(id)),
            _ => None,
        }
    }

    pub fn to_line(self) -> String {
        match self {
            Self::Pause(id) => format!("pause {id}\n"),
            Self::Resume(id) => format!("resume {id}\n"),
            Self::Remove(id) => format!("remove {id}\n"),
        }
    }
}

/// Spawns a task that listens on `path` and forwards each command to the
/// coordinator. Malformed lines are ignored.
pub fn spawn_control_listener(
    coordinator: DownloadCoordinator,
    db: ResumeDb,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let coordinator = coordinator.clone();
                    let db = db.clone();
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            match ControlCommand::parse(&line) {
                                Some(cmd) => dispatch(&coordinator, &db, cmd).await,
                                None => tracing::debug!(line = %line, "ignoring control line"),
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn dispatch(coordinator: &DownloadCoordinator, db: &ResumeDb, cmd: ControlCommand) {
    tracing::debug!(?cmd, "control command");
    let result = match cmd {
        ControlCommand::Pause(id) => coordinator.pause(&DownloadId::from(id)).await,
        ControlCommand::Remove(id) => coordinator.remove(&DownloadId::from(id)).await.map(|_| ()),
        ControlCommand::Resume(id) => {
            let did = DownloadId::from(id);
            match coordinator.lookup(&did).await {
                Ok(Some(_)) => coordinator.resume(&did).await,
                // Not loaded by this run (it was paused or failed at start).
                Ok(None) => match db.get_download(id).await {
                    Ok(Some(row)) => {
                        coordinator
                            .append(DownloadRecord::with_id(did, row.request))
                            .await
                    }
                    Ok(None) => Ok(()),
                    Err(e) => {
                        tracing::warn!(id, "control resume: {:#}", e);
                        Ok(())
                    }
                },
                Err(e) => Err(e),
            }
        }
    };
    if let Err(e) = result {
        tracing::debug!(?cmd, "control command not applied: {}", e);
    }
}

/// Sends `cmd` to a running `bookdl run`. No-op when nothing is listening.
pub async fn send(socket_path: &Path, cmd: ControlCommand) -> Result<()> {
    if !socket_path.exists() {
        return Ok(());
    }
    let mut stream = UnixStream::connect(socket_path).await?;
    stream.write_all(cmd.to_line().as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// `send` to the default socket; failures are only logged since the
/// database update alone is enough when no run is active.
pub async fn notify(cmd: ControlCommand) {
    let result = match config::control_socket_path() {
        Ok(path) => send(&path, cmd).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::debug!(?cmd, "control socket: {:#}", e);
    }
}
