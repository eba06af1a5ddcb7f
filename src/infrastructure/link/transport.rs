//! Link transports.
//!
//! The link layer talks to the helmet over any byte stream that behaves
//! like a serial port. The production transport is an RFCOMM (SPP) socket
//! via BlueZ; the TCP transport covers serial-over-TCP bridges and keeps
//! the rest of the stack exercisable without a Bluetooth adapter.

use crate::domain::models::PeerDevice;
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// Object-safe bound for the streams transports hand back.
pub trait LinkIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> LinkIo for T {}

/// A connected byte stream to the helmet.
pub type LinkStream = Box<dyn LinkIo>;

/// Socket-level access to one peer device.
#[async_trait]
pub trait LinkTransport: Send + Sync + 'static {
    /// Open a stream to `peer`. Suspends until the socket connects or
    /// fails; the caller applies its own timeout policy on top.
    async fn connect(&self, peer: &PeerDevice) -> io::Result<LinkStream>;
}

/// Serial-over-TCP bridge transport; the peer address is `host:port`.
pub struct TcpTransport;

#[async_trait]
impl LinkTransport for TcpTransport {
    async fn connect(&self, peer: &PeerDevice) -> io::Result<LinkStream> {
        let stream = tokio::net::TcpStream::connect(peer.address.as_str()).await?;
        let _ = stream.set_nodelay(true);
        Ok(Box::new(stream))
    }
}

#[cfg(feature = "bluetooth")]
pub use rfcomm::{find_peer, paired_devices, RfcommTransport};

#[cfg(feature = "bluetooth")]
mod rfcomm {
    use super::{LinkStream, LinkTransport, PeerDevice};
    use async_trait::async_trait;
    use bluer::rfcomm::{SocketAddr, Stream};
    use std::io;
    use tracing::info;

    /// RFCOMM (SPP) transport. The helmet advertises the classic serial
    /// port profile, so connecting by address and channel is enough; no
    /// SDP lookup is performed.
    pub struct RfcommTransport {
        channel: u8,
    }

    impl RfcommTransport {
        pub fn new(channel: u8) -> Self {
            Self { channel }
        }
    }

    #[async_trait]
    impl LinkTransport for RfcommTransport {
        async fn connect(&self, peer: &PeerDevice) -> io::Result<LinkStream> {
            let address: bluer::Address = peer
                .address
                .parse()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            info!(
                "Opening RFCOMM channel {} to {}",
                self.channel, peer.address
            );
            let stream = Stream::connect(SocketAddr::new(address, self.channel)).await?;
            Ok(Box::new(stream))
        }
    }

    /// Enumerate bonded devices known to the default adapter.
    pub async fn paired_devices() -> bluer::Result<Vec<PeerDevice>> {
        let session = bluer::Session::new().await?;
        let adapter = session.default_adapter().await?;

        let mut devices = Vec::new();
        for address in adapter.device_addresses().await? {
            let device = adapter.device(address)?;
            if !device.is_paired().await.unwrap_or(false) {
                continue;
            }
            let name = device
                .name()
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| address.to_string());
            devices.push(PeerDevice::new(address.to_string(), name));
        }
        Ok(devices)
    }

    /// First bonded device whose name contains `fragment` (case-insensitive).
    pub async fn find_peer(fragment: &str) -> bluer::Result<Option<PeerDevice>> {
        let fragment = fragment.to_lowercase();
        let peer = paired_devices()
            .await?
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&fragment));
        Ok(peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn tcp_transport_connects_to_a_bridge() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let bridge = tokio::spawn(async move {
            let (mut server, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            server.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"time\n");
            server.write_all(b"ok\n").await.unwrap();
        });

        let peer = PeerDevice::new(addr.to_string(), "bridge");
        let mut stream = TcpTransport.connect(&peer).await.unwrap();
        stream.write_all(b"time\n").await.unwrap();
        let mut reply = [0u8; 3];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"ok\n");
        bridge.await.unwrap();
    }

    #[tokio::test]
    async fn tcp_transport_reports_refused_connections() {
        let peer = PeerDevice::new("127.0.0.1:1", "unreachable bridge");
        assert!(TcpTransport.connect(&peer).await.is_err());
    }
}
