//! Connection state and the inbound reader loop.

use crate::domain::models::{LinkEvent, PeerDevice};
use crate::infrastructure::link::transport::LinkStream;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Read buffer size for the inbound loop.
pub(crate) const READ_BUFFER_SIZE: usize = 1024;

pub(crate) type ReadHalf = tokio::io::ReadHalf<LinkStream>;
pub(crate) type WriteHalf = tokio::io::WriteHalf<LinkStream>;

/// One live connection to the helmet.
///
/// Invariant: either the slot is empty or every field here is live. The
/// fields are installed and cleared together under the slot lock, never
/// piecemeal.
pub(crate) struct ActiveLink {
    pub(crate) peer: PeerDevice,
    pub(crate) writer: WriteHalf,
    pub(crate) reader_task: JoinHandle<()>,
}

/// The single mutation point for the current connection.
///
/// Every connect, send and teardown path funnels through the one mutex, so
/// no caller ever observes a half-installed or half-cleared connection.
pub(crate) struct ConnectionSlot {
    inner: Mutex<Option<ActiveLink>>,
}

impl ConnectionSlot {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<ActiveLink>> {
        self.inner.lock().await
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}

/// Inbound loop for one connection.
///
/// Holds until the install gate fires so its first read cannot race the
/// installation of the connection it belongs to, then reads until EOF or
/// error. Completed newline-terminated frames are trimmed and posted to the
/// event channel; delivery never blocks the next read. `on_loss` runs once
/// when the link drops; a task abort during teardown skips it, which keeps
/// deliberate shutdown from re-entering cleanup.
pub(crate) async fn read_loop<F>(
    mut reader: ReadHalf,
    ready: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<LinkEvent>,
    on_loss: F,
) where
    F: FnOnce() + Send,
{
    if ready.await.is_err() {
        // Connect attempt was abandoned before installation finished.
        return;
    }

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Link closed by peer");
                break;
            }
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                for line in drain_lines(&mut pending) {
                    if line.is_empty() {
                        continue;
                    }
                    let _ = events.send(LinkEvent::DataReceived(line));
                }
            }
            Err(e) => {
                warn!("Link read failed: {e}");
                break;
            }
        }
    }
    on_loss();
}

/// Split completed newline-terminated frames out of `pending`, leaving any
/// partial trailing frame in place. Returned frames are decoded as UTF-8
/// (lossily) and whitespace-trimmed.
fn drain_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let frame: Vec<u8> = pending.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&frame).trim().to_string());
    }
    lines
}
