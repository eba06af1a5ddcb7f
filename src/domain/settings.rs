use crate::domain::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_enabled: bool,
    #[serde(default = "default_false")]
    pub file_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_enabled: default_true(),
            file_enabled: default_false(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "armor_companion".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Helmet address: Bluetooth address for rfcomm, `host:port` for tcp.
    /// When unset, paired devices are searched by name instead.
    #[serde(default)]
    pub peer_address: Option<String>,
    #[serde(default = "default_peer_name_filter")]
    pub peer_name_filter: String,

    // Link settings
    #[serde(default = "default_transport")]
    pub transport: String, // "rfcomm" or "tcp"
    #[serde(default = "default_rfcomm_channel")]
    pub rfcomm_channel: u8,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    // SOS settings
    #[serde(default)]
    pub sos_contacts: Vec<String>,
    #[serde(default)]
    pub sms_command: Option<String>,

    // Weather settings
    #[serde(default)]
    pub weather_api_key: String,
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,

    // Location settings
    #[serde(default)]
    pub static_location: Option<Coordinates>,
    #[serde(default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,

    /// Socket path where call/notification listeners deliver host events.
    #[serde(default)]
    pub relay_socket: Option<PathBuf>,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            peer_address: None,
            peer_name_filter: default_peer_name_filter(),
            transport: default_transport(),
            rfcomm_channel: default_rfcomm_channel(),
            connect_timeout_secs: default_connect_timeout_secs(),
            sos_contacts: Vec::new(),
            sms_command: None,
            weather_api_key: String::new(),
            weather_base_url: default_weather_base_url(),
            static_location: None,
            location_timeout_secs: default_location_timeout_secs(),
            relay_socket: None,
            log_settings: LogSettings::default(),
        }
    }
}

fn default_peer_name_filter() -> String {
    "ARmor".to_string()
}
fn default_transport() -> String {
    "rfcomm".to_string()
}
fn default_rfcomm_channel() -> u8 {
    // The well-known SPP channel.
    1
}
fn default_connect_timeout_secs() -> u64 {
    20
}
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}
fn default_location_timeout_secs() -> u64 {
    10
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("ArmorCompanion");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.peer_name_filter, "ARmor");
        assert_eq!(settings.transport, "rfcomm");
        assert_eq!(settings.rfcomm_channel, 1);
        assert_eq!(settings.connect_timeout_secs, 20);
        assert_eq!(settings.location_timeout_secs, 10);
        assert!(settings.sos_contacts.is_empty());
        assert!(settings.weather_api_key.is_empty());
        assert!(settings.static_location.is_none());
    }

    #[test]
    fn load_reads_a_settings_file() {
        let path = std::env::temp_dir().join(format!(
            "armor-settings-test-{}.json",
            std::process::id()
        ));
        fs::write(
            &path,
            r#"{"peer_address": "AA:BB:CC:DD:EE:FF", "transport": "tcp", "sos_contacts": ["+43123456"]}"#,
        )
        .unwrap();

        let settings = SettingsService::load_from_file(&path).unwrap();
        assert_eq!(settings.peer_address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(settings.transport, "tcp");
        assert_eq!(settings.sos_contacts, vec!["+43123456".to_string()]);
        // Unlisted fields keep their defaults
        assert_eq!(settings.connect_timeout_secs, 20);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn settings_survive_a_json_round_trip() {
        let mut settings = Settings::default();
        settings.peer_address = Some("AA:BB:CC:DD:EE:FF".to_string());
        settings.sos_contacts = vec!["+43123456".to_string(), "+43654321".to_string()];
        settings.static_location = Some(Coordinates {
            latitude: 48.2082,
            longitude: 16.3738,
        });

        let json = serde_json::to_string_pretty(&settings).unwrap();
        let restored: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.peer_address, settings.peer_address);
        assert_eq!(restored.sos_contacts, settings.sos_contacts);
        assert_eq!(restored.static_location, settings.static_location);
    }
}
