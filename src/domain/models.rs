//! Core data types shared across the companion.

use serde::{Deserialize, Serialize};

/// A bonded helmet unit the companion can connect to.
///
/// The address is opaque to the link layer; the transport in use decides how
/// to interpret it (Bluetooth address for RFCOMM, `host:port` for the TCP
/// bridge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDevice {
    pub address: String,
    pub name: String,
}

impl PeerDevice {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

/// Events emitted by the link layer, drained by the owning application on
/// its own execution context.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected(PeerDevice),
    Disconnected,
    ConnectionFailed(String),
    DataReceived(String),
}

/// Connection lifecycle state as tracked by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Shareable map link for SOS messages.
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Current conditions returned by the weather collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub temperature: f64,
    pub description: String,
    pub humidity: u32,
    pub wind_speed: f64,
    pub icon: Option<String>,
}

impl WeatherReport {
    /// One-line reply sent back over the link.
    pub fn to_link_message(&self) -> String {
        format!("Weather: {}°C, {}", self.temperature, self.description)
    }
}
