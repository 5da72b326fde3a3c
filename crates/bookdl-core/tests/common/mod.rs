#![allow(dead_code)]

pub mod http_server;
pub mod mock_transport;

use std::time::Duration;

use bookdl_core::DownloadEvent;
use tokio::sync::mpsc;

/// Events already delivered to `rx`, without waiting.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<DownloadEvent>) -> Vec<DownloadEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

/// Waits (bounded) for the first event `pick` accepts.
pub async fn wait_for<T>(
    rx: &mut mpsc::UnboundedReceiver<DownloadEvent>,
    mut pick: impl FnMut(&DownloadEvent) -> Option<T>,
) -> T {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.expect("event stream closed");
            if let Some(found) = pick(&event) {
                return found;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
