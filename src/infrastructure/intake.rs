//! Host event intake.
//!
//! Call and notification listeners are separate processes (desktop
//! integration, modem monitor). They deliver events as single text lines
//! over a Unix socket; every well-formed line becomes a `HostEvent` pushed
//! into the application's relay queue. Malformed lines are dropped.

use crate::app::RelayHandle;
use crate::domain::events::HostEvent;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bind the intake socket and accept listener clients until the socket
/// errors out.
pub fn spawn(path: PathBuf, relay: RelayHandle) -> io::Result<JoinHandle<()>> {
    // A stale socket file from a previous run would block the bind
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    info!("Host event intake listening on {}", path.display());

    Ok(tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    tokio::spawn(handle_client(stream, relay.clone()));
                }
                Err(e) => {
                    warn!("Intake accept failed: {e}");
                    break;
                }
            }
        }
    }))
}

async fn handle_client(stream: UnixStream, relay: RelayHandle) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match HostEvent::parse(&line) {
            Some(event) => relay.push(event),
            None => debug!("Ignoring malformed intake line: {line}"),
        }
    }
}
