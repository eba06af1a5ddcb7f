//! Application layer: drains link events, executes helmet commands and
//! forwards relayed host events, with every collaborator injected at
//! construction.

use crate::domain::commands::HelmetCommand;
use crate::domain::events::HostEvent;
use crate::domain::models::{ConnectionStatus, LinkEvent, PeerDevice};
use crate::infrastructure::link::LinkService;
use crate::infrastructure::location::LocationService;
use crate::infrastructure::sms::SmsSender;
use crate::infrastructure::weather::WeatherClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Handle host-side event sources push through; cheap to clone.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl RelayHandle {
    pub fn push(&self, event: HostEvent) {
        let _ = self.tx.send(event);
    }
}

pub(crate) fn relay_channel() -> (RelayHandle, mpsc::UnboundedReceiver<HostEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RelayHandle { tx }, rx)
}

pub struct CompanionApp {
    link: LinkService,
    link_events: mpsc::UnboundedReceiver<LinkEvent>,
    relay_events: mpsc::UnboundedReceiver<HostEvent>,
    location: LocationService,
    weather: WeatherClient,
    sms: Arc<dyn SmsSender>,
    sos_contacts: Vec<String>,
    status: ConnectionStatus,
}

impl CompanionApp {
    pub fn new(
        link: LinkService,
        link_events: mpsc::UnboundedReceiver<LinkEvent>,
        location: LocationService,
        weather: WeatherClient,
        sms: Arc<dyn SmsSender>,
        sos_contacts: Vec<String>,
    ) -> (Self, RelayHandle) {
        let (relay, relay_events) = relay_channel();
        let app = Self {
            link,
            link_events,
            relay_events,
            location,
            weather,
            sms,
            sos_contacts,
            status: ConnectionStatus::Disconnected,
        };
        (app, relay)
    }

    /// Kick off the initial connection attempt.
    pub async fn connect(&mut self, peer: PeerDevice) {
        self.set_status(ConnectionStatus::Connecting);
        self.link.connect(peer).await;
    }

    /// Pump events until every inlet is closed.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.link_events.recv() => self.handle_link_event(event).await,
                Some(event) = self.relay_events.recv() => self.relay_to_helmet(event).await,
                else => break,
            }
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            debug!("Link status: {:?} -> {:?}", self.status, status);
            self.status = status;
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected(peer) => {
                self.set_status(ConnectionStatus::Connected);
                info!("Connected to {}", peer.name);
            }
            LinkEvent::Disconnected => {
                self.set_status(ConnectionStatus::Disconnected);
                info!("Link disconnected");
            }
            LinkEvent::ConnectionFailed(reason) => {
                self.set_status(ConnectionStatus::Disconnected);
                warn!("Link failure: {reason}");
            }
            LinkEvent::DataReceived(message) => self.dispatch(&message).await,
        }
    }

    async fn dispatch(&mut self, message: &str) {
        debug!("Received: {message}");
        let Some(command) = HelmetCommand::parse(message) else {
            info!("Unknown command: {message}");
            return;
        };
        match command {
            HelmetCommand::Time => {
                self.link.send(&time_reply(chrono::Local::now())).await;
            }
            HelmetCommand::Navigate => {
                self.link.send("Navigation mode activated").await;
            }
            HelmetCommand::BtStatus => {
                let reply = if self.link.is_connected().await {
                    "Connected"
                } else {
                    "Disconnected"
                };
                self.link.send(reply).await;
            }
            HelmetCommand::Weather => self.handle_weather().await,
            HelmetCommand::Sos => self.handle_sos().await,
        }
    }

    async fn handle_weather(&mut self) {
        let coords = match self.location.locate().await {
            Ok(coords) => coords,
            Err(e) => {
                self.link.send(&format!("Location unavailable: {e}")).await;
                return;
            }
        };
        match self.weather.fetch(coords).await {
            Ok(report) => self.link.send(&report.to_link_message()).await,
            Err(e) => {
                warn!("Weather lookup failed: {e}");
                self.link.send(&format!("Weather error: {e}")).await;
            }
        }
    }

    async fn handle_sos(&mut self) {
        if self.sos_contacts.is_empty() {
            self.link.send("SOS: No contacts saved").await;
            return;
        }
        match self.location.locate().await {
            Ok(coords) => {
                let text = format!("SOS! I need help! Location: {}", coords.maps_url());
                for number in &self.sos_contacts {
                    self.sms.send(number, &text);
                }
                self.link.send("SOS sent with location").await;
            }
            Err(e) => {
                self.link.send(&format!("SOS failed: {e}")).await;
            }
        }
    }

    /// Forward one host event out to the helmet. Dropped silently while the
    /// link is down.
    async fn relay_to_helmet(&mut self, event: HostEvent) {
        if !self.link.is_connected().await {
            debug!("Link down, dropping host event: {event:?}");
            return;
        }
        self.link.send(&event.to_link_message()).await;
    }
}

fn time_reply<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Time: {}, Date: {}",
        now.format("%H:%M:%S"),
        now.format("%Y-%m-%d")
    )
}
