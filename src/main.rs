mod app;
mod domain;
mod infrastructure;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use app::CompanionApp;
use domain::models::PeerDevice;
use domain::settings::{Settings, SettingsService};
use infrastructure::link::transport::{LinkTransport, TcpTransport};
use infrastructure::link::{LinkConfig, LinkService};
use infrastructure::location::{LocationService, StaticLocation};
use infrastructure::sms::{CommandSmsSender, SmsDisabled, SmsSender};
use infrastructure::weather::WeatherClient;

#[tokio::main]
async fn main() -> Result<()> {
    let settings_service = SettingsService::new().context("loading settings")?;
    let settings = settings_service.get().clone();
    let _logging = infrastructure::logging::init(&settings.log_settings)?;
    info!("Starting ARmor companion");

    // First run: persist the defaults so there is a file to edit
    if !settings_service.path().exists() {
        settings_service.save().context("writing default settings")?;
        info!("Wrote default settings to {}", settings_service.path().display());
    }

    let transport = build_transport(&settings)?;
    let (link, link_events) = LinkService::new(
        transport,
        LinkConfig {
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        },
    );

    let location = LocationService::new(
        Arc::new(StaticLocation::new(settings.static_location)),
        Duration::from_secs(settings.location_timeout_secs),
    );
    let weather = WeatherClient::new(
        settings.weather_api_key.clone(),
        settings.weather_base_url.clone(),
    );
    let sms: Arc<dyn SmsSender> = match &settings.sms_command {
        Some(command) => Arc::new(CommandSmsSender::new(command.clone())),
        None => Arc::new(SmsDisabled),
    };

    let peer = resolve_peer(&settings).await?;
    info!("Target helmet: {} ({})", peer.name, peer.address);

    let (mut companion, relay) = CompanionApp::new(
        link.clone(),
        link_events,
        location,
        weather,
        sms,
        settings.sos_contacts.clone(),
    );

    if let Some(path) = settings.relay_socket.clone() {
        let _intake = infrastructure::intake::spawn(path, relay.clone())
            .context("binding host event intake socket")?;
    }

    companion.connect(peer).await;

    tokio::select! {
        _ = companion.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            link.disconnect().await;
        }
    }
    Ok(())
}

fn build_transport(settings: &Settings) -> Result<Box<dyn LinkTransport>> {
    match settings.transport.as_str() {
        "tcp" => Ok(Box::new(TcpTransport)),
        #[cfg(feature = "bluetooth")]
        "rfcomm" => Ok(Box::new(
            infrastructure::link::transport::RfcommTransport::new(settings.rfcomm_channel),
        )),
        #[cfg(not(feature = "bluetooth"))]
        "rfcomm" => bail!("rfcomm transport requires building with the `bluetooth` feature"),
        other => bail!("unknown transport `{other}` (expected `rfcomm` or `tcp`)"),
    }
}

async fn resolve_peer(settings: &Settings) -> Result<PeerDevice> {
    if let Some(address) = &settings.peer_address {
        return Ok(PeerDevice::new(
            address.clone(),
            settings.peer_name_filter.clone(),
        ));
    }

    #[cfg(feature = "bluetooth")]
    if settings.transport == "rfcomm" {
        return match infrastructure::link::transport::find_peer(&settings.peer_name_filter).await?
        {
            Some(peer) => Ok(peer),
            None => bail!(
                "{} not found among paired devices. Please pair it first.",
                settings.peer_name_filter
            ),
        };
    }

    bail!("no peer_address configured")
}
