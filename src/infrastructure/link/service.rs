//! Link Service Module
//!
//! Coordinates the connection lifecycle and the message paths over it. One
//! `LinkService` manages at most one live connection at a time: connect
//! attempts collapse while one is in flight, sends serialize on the
//! connection slot, and teardown is idempotent no matter which failure path
//! invoked it. Every outcome surfaces as exactly one event on the channel
//! handed out at construction; the embedding application drains that
//! channel on whatever execution context suits it.

use crate::domain::models::{LinkEvent, PeerDevice};
use crate::infrastructure::link::connection::{read_loop, ActiveLink, ConnectionSlot};
use crate::infrastructure::link::transport::LinkTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Tunables for the link service.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Deadline for a socket-level connect attempt.
    pub connect_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(20),
        }
    }
}

/// Handle to the link layer. Cheap to clone; all clones share the same
/// connection.
#[derive(Clone)]
pub struct LinkService {
    inner: Arc<LinkInner>,
}

struct LinkInner {
    transport: Box<dyn LinkTransport>,
    config: LinkConfig,
    slot: ConnectionSlot,
    /// Single-flight guard for connect attempts.
    connecting: AtomicBool,
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl LinkService {
    /// Create a service over `transport`. Link events surface on the
    /// returned receiver.
    pub fn new(
        transport: Box<dyn LinkTransport>,
        config: LinkConfig,
    ) -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let service = Self {
            inner: Arc::new(LinkInner {
                transport,
                config,
                slot: ConnectionSlot::new(),
                connecting: AtomicBool::new(false),
                events,
            }),
        };
        (service, events_rx)
    }

    /// Begin connecting to `peer`. No-op while a connect is already in
    /// flight or a connection is already up; the attempt itself runs on a
    /// background task and the call returns immediately.
    pub async fn connect(&self, peer: PeerDevice) {
        let inner = self.inner.clone();
        if inner.connecting.swap(true, Ordering::SeqCst) {
            debug!("Connect ignored: attempt already in flight");
            return;
        }
        if inner.slot.is_connected().await {
            inner.connecting.store(false, Ordering::SeqCst);
            debug!("Connect ignored: already connected");
            return;
        }
        tokio::spawn(async move {
            inner.run_connect(peer).await;
            // Cleared on every outcome, success or failure
            inner.connecting.store(false, Ordering::SeqCst);
        });
    }

    /// Send one message to the helmet. Reports `Not connected` without side
    /// effects when no connection is up; a write failure tears the
    /// connection down rather than retrying.
    pub async fn send(&self, message: &str) {
        self.inner.send(message).await;
    }

    /// User-initiated disconnect: tear down whatever exists and always
    /// report, even when nothing was connected.
    pub async fn disconnect(&self) {
        if !self.inner.teardown().await {
            let _ = self.inner.events.send(LinkEvent::Disconnected);
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.slot.is_connected().await
    }
}

impl LinkInner {
    async fn run_connect(self: &Arc<Self>, peer: PeerDevice) {
        info!(address = %peer.address, "Connecting to {}", peer.name);

        let stream = match timeout(self.config.connect_timeout, self.transport.connect(&peer)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                // Covers any partially-opened state, releases the
                // in-flight guard, then reports; a caller reacting to the
                // failure can retry right away.
                self.teardown().await;
                self.connecting.store(false, Ordering::SeqCst);
                warn!("Connection to {} failed: {e}", peer.name);
                let _ = self
                    .events
                    .send(LinkEvent::ConnectionFailed(format!("Connection failed: {e}")));
                return;
            }
            Err(_) => {
                self.teardown().await;
                self.connecting.store(false, Ordering::SeqCst);
                warn!(
                    "Connection to {} timed out after {:?}",
                    peer.name, self.config.connect_timeout
                );
                let _ = self
                    .events
                    .send(LinkEvent::ConnectionFailed("Connection timed out".to_string()));
                return;
            }
        };

        let (read_half, write_half) = tokio::io::split(stream);
        let (ready_tx, ready_rx) = oneshot::channel();

        // Loss detected by the reader tears down on a fresh task; the
        // reader itself must stay abortable without losing the event.
        let loss = Arc::clone(self);
        let on_loss = move || {
            tokio::spawn(async move {
                loss.teardown().await;
            });
        };

        // Install everything under the slot lock: the gate keeps the
        // reader's first read behind the installation, and teardown cannot
        // interleave until the lock drops, so the Connected event always
        // precedes any Disconnected for this link.
        let mut guard = self.slot.lock().await;
        let reader_task = tokio::spawn(read_loop(read_half, ready_rx, self.events.clone(), on_loss));
        *guard = Some(ActiveLink {
            peer: peer.clone(),
            writer: write_half,
            reader_task,
        });
        let _ = ready_tx.send(());
        info!("Connected to {}", peer.name);
        let _ = self.events.send(LinkEvent::Connected(peer));
    }

    async fn send(&self, message: &str) {
        let mut guard = self.slot.lock().await;
        let Some(link) = guard.as_mut() else {
            drop(guard);
            debug!("Send refused: no active connection");
            let _ = self
                .events
                .send(LinkEvent::ConnectionFailed("Not connected".to_string()));
            return;
        };

        let mut bytes = message.as_bytes().to_vec();
        if !message.ends_with('\n') {
            bytes.push(b'\n');
        }
        let result = match link.writer.write_all(&bytes).await {
            Ok(()) => link.writer.flush().await,
            Err(e) => Err(e),
        };
        drop(guard);

        match result {
            Ok(()) => debug!("Sent: {}", message.trim_end()),
            Err(e) => {
                // No partial-write recovery; a failed link goes down whole
                warn!("Link write failed: {e}");
                self.teardown().await;
            }
        }
    }

    /// Release the current connection, if any. Returns whether there was
    /// one; emits `Disconnected` only for an actual teardown.
    async fn teardown(&self) -> bool {
        let mut guard = self.slot.lock().await;
        let Some(mut link) = guard.take() else {
            return false;
        };
        // Signal the reader, never join it: teardown may have been
        // triggered from the reader's own loss path.
        link.reader_task.abort();
        if let Err(e) = link.writer.shutdown().await {
            debug!("Ignoring stream shutdown error: {e}");
        }
        drop(guard);

        info!("Disconnected from {}", link.peer.name);
        let _ = self.events.send(LinkEvent::Disconnected);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::link::transport::testing::MemoryTransport;
    use std::sync::atomic::Ordering;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn helmet() -> PeerDevice {
        PeerDevice::new("AA:BB:CC:DD:EE:FF", "ARmor Helmet")
    }

    fn quick_config() -> LinkConfig {
        LinkConfig {
            connect_timeout: Duration::from_millis(500),
        }
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for link event")
            .expect("event channel closed")
    }

    fn connected_service(
    ) -> (LinkService, mpsc::UnboundedReceiver<LinkEvent>, DuplexStream) {
        let (client, peer_side) = tokio::io::duplex(1024);
        let transport = MemoryTransport::new(vec![client]);
        let (service, events) = LinkService::new(Box::new(transport), quick_config());
        (service, events, peer_side)
    }

    #[tokio::test]
    async fn connect_reports_connected_once() {
        let (service, mut events, _peer_side) = connected_service();

        service.connect(helmet()).await;
        assert_eq!(next_event(&mut events).await, LinkEvent::Connected(helmet()));
        assert!(service.is_connected().await);
    }

    #[tokio::test]
    async fn connect_is_single_flight() {
        let (client, _peer_side) = tokio::io::duplex(1024);
        let transport = MemoryTransport::new(vec![client]).with_delay(Duration::from_millis(50));
        let attempts = transport.attempts.clone();
        let (service, mut events) = LinkService::new(Box::new(transport), quick_config());

        service.connect(helmet()).await;
        service.connect(helmet()).await;
        assert_eq!(next_event(&mut events).await, LinkEvent::Connected(helmet()));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        // Connected now, so further requests are still no-ops
        service.connect(helmet()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_connect_reports_reason() {
        let transport = MemoryTransport::new(Vec::new());
        let (service, mut events) = LinkService::new(Box::new(transport), quick_config());

        service.connect(helmet()).await;
        match next_event(&mut events).await {
            LinkEvent::ConnectionFailed(reason) => {
                assert!(reason.starts_with("Connection failed:"), "got: {reason}");
            }
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
        assert!(!service.is_connected().await);

        // The in-flight flag was released, so a retry attempts again
        service.connect(helmet()).await;
        assert!(matches!(
            next_event(&mut events).await,
            LinkEvent::ConnectionFailed(_)
        ));
    }

    #[tokio::test]
    async fn send_without_connection_reports_not_connected() {
        let (service, mut events) = LinkService::new(
            Box::new(MemoryTransport::new(Vec::new())),
            quick_config(),
        );

        service.send("time").await;
        assert_eq!(
            next_event(&mut events).await,
            LinkEvent::ConnectionFailed("Not connected".to_string())
        );
    }

    #[tokio::test]
    async fn messages_round_trip_newline_framed() {
        let (service, mut events, peer_side) = connected_service();
        service.connect(helmet()).await;
        next_event(&mut events).await;

        let (mut peer_read, mut peer_write) = tokio::io::split(peer_side);

        service.send("SOS sent with location").await;
        let mut buf = vec![0u8; 64];
        let n = peer_read.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"SOS sent with location\n");

        peer_write.write_all(b"time\n").await.unwrap();
        assert_eq!(
            next_event(&mut events).await,
            LinkEvent::DataReceived("time".to_string())
        );
    }

    #[tokio::test]
    async fn peer_close_triggers_one_teardown() {
        let (service, mut events, peer_side) = connected_service();
        service.connect(helmet()).await;
        next_event(&mut events).await;

        drop(peer_side);
        assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
        assert!(!service.is_connected().await);

        // Nothing further arrives from the loss path
        assert!(timeout(Duration::from_millis(100), events.recv()).await.is_err());
    }

    #[tokio::test]
    async fn teardown_is_idempotent() {
        let (service, mut events, _peer_side) = connected_service();
        service.connect(helmet()).await;
        next_event(&mut events).await;

        assert!(service.inner.teardown().await);
        assert!(!service.inner.teardown().await);
        assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
        assert!(timeout(Duration::from_millis(100), events.recv()).await.is_err());
    }

    #[tokio::test]
    async fn explicit_disconnect_always_notifies() {
        let (service, mut events) = LinkService::new(
            Box::new(MemoryTransport::new(Vec::new())),
            quick_config(),
        );

        // Nothing connected, yet each call reports once
        service.disconnect().await;
        assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
        service.disconnect().await;
        assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);
    }

    #[tokio::test]
    async fn write_failure_tears_down() {
        let (service, mut events, peer_side) = connected_service();
        service.connect(helmet()).await;
        next_event(&mut events).await;

        // Closing the peer makes either the failed write or the reader's
        // EOF win the teardown; exactly one Disconnected arrives either
        // way, possibly alongside a send refusal.
        drop(peer_side);
        service.send("status update").await;
        let mut saw_disconnect = false;
        for _ in 0..2 {
            match timeout(Duration::from_millis(500), events.recv()).await {
                Ok(Some(LinkEvent::Disconnected)) => {
                    saw_disconnect = true;
                    break;
                }
                Ok(Some(LinkEvent::ConnectionFailed(_))) => continue,
                Ok(other) => panic!("unexpected event: {other:?}"),
                Err(_) => break,
            }
        }
        assert!(saw_disconnect);
        assert!(!service.is_connected().await);
    }

    #[tokio::test]
    async fn reconnect_after_disconnect_uses_fresh_stream() {
        let (client_a, peer_a) = tokio::io::duplex(1024);
        let (client_b, _peer_b) = tokio::io::duplex(1024);
        // Endpoints pop from the back
        let transport = MemoryTransport::new(vec![client_a, client_b]);
        let (service, mut events) = LinkService::new(Box::new(transport), quick_config());

        service.connect(helmet()).await;
        assert_eq!(next_event(&mut events).await, LinkEvent::Connected(helmet()));
        service.disconnect().await;
        assert_eq!(next_event(&mut events).await, LinkEvent::Disconnected);

        service.connect(helmet()).await;
        assert_eq!(next_event(&mut events).await, LinkEvent::Connected(helmet()));
        assert!(service.is_connected().await);
        drop(peer_a);
    }
}
