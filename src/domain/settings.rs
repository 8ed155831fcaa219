use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
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
    "esp32_remote".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Peripheral contract and scan policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BleSettings {
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,
    #[serde(default = "default_characteristic_uuid")]
    pub characteristic_uuid: String,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    /// Byte written on trigger. 49 is ASCII '1', which the firmware toggles on.
    #[serde(default = "default_trigger_payload")]
    pub trigger_payload: u8,
    #[serde(default = "default_trigger_label")]
    pub trigger_label: String,
    /// Start scanning as soon as the adapter reports powered on.
    #[serde(default = "default_true")]
    pub auto_scan: bool,
}

impl Default for BleSettings {
    fn default() -> Self {
        Self {
            service_uuid: default_service_uuid(),
            characteristic_uuid: default_characteristic_uuid(),
            scan_timeout_secs: default_scan_timeout_secs(),
            trigger_payload: default_trigger_payload(),
            trigger_label: default_trigger_label(),
            auto_scan: default_true(),
        }
    }
}

fn default_service_uuid() -> String {
    "0000ffe0-0000-1000-8000-00805f9b34fb".to_string()
}
fn default_characteristic_uuid() -> String {
    "0000ffe1-0000-1000-8000-00805f9b34fb".to_string()
}
fn default_scan_timeout_secs() -> u64 {
    10
}
fn default_trigger_payload() -> u8 {
    b'1'
}
fn default_trigger_label() -> String {
    "GPIO 27".to_string()
}

/// Client identifiers registered with the provider, one per platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientIds {
    #[serde(default)]
    pub ios: Option<String>,
    #[serde(default)]
    pub android: Option<String>,
    #[serde(default)]
    pub web: Option<String>,
}

impl ClientIds {
    /// Picks the identifier for the OS this binary was built for.
    pub fn for_os(&self, os: &str) -> Option<&str> {
        let id = match os {
            "ios" => &self.ios,
            "android" => &self.android,
            _ => &self.web,
        };
        id.as_deref().filter(|id| !id.is_empty())
    }
}

pub const ENV_IOS_CLIENT_ID: &str = "ESP32_REMOTE_IOS_CLIENT_ID";
pub const ENV_ANDROID_CLIENT_ID: &str = "ESP32_REMOTE_ANDROID_CLIENT_ID";
pub const ENV_WEB_CLIENT_ID: &str = "ESP32_REMOTE_WEB_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ESP32_REMOTE_CLIENT_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub client_ids: ClientIds,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// 0 lets the OS pick a free loopback port.
    #[serde(default)]
    pub redirect_port: u16,
    #[serde(default = "default_consent_timeout_secs")]
    pub consent_timeout_secs: u64,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            profile_url: default_profile_url(),
            scopes: default_scopes(),
            client_ids: ClientIds::default(),
            client_secret: None,
            redirect_port: 0,
            consent_timeout_secs: default_consent_timeout_secs(),
        }
    }
}

impl OAuthSettings {
    /// Overlays client credentials supplied out-of-band.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(id) = non_empty(ENV_IOS_CLIENT_ID) {
            self.client_ids.ios = Some(id);
        }
        if let Some(id) = non_empty(ENV_ANDROID_CLIENT_ID) {
            self.client_ids.android = Some(id);
        }
        if let Some(id) = non_empty(ENV_WEB_CLIENT_ID) {
            self.client_ids.web = Some(id);
        }
        if let Some(secret) = non_empty(ENV_CLIENT_SECRET) {
            self.client_secret = Some(secret);
        }
    }
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}
fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}
fn default_profile_url() -> String {
    "https://www.googleapis.com/userinfo/v2/me".to_string()
}
fn default_scopes() -> Vec<String> {
    vec!["profile".to_string(), "email".to_string()]
}
fn default_consent_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,
    #[serde(default)]
    pub ble: BleSettings,
    #[serde(default)]
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub dark_mode: bool,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::at(settings_path))
    }

    /// Loads from `settings_path`, falling back to defaults if it is missing or unreadable.
    pub fn at(settings_path: PathBuf) -> Self {
        let mut settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                // Logging is not up yet when settings load.
                eprintln!(
                    "Using default settings ({}): {}",
                    settings_path.display(),
                    e
                );
                Settings::default()
            }
        };
        settings.oauth.apply_env(|key| std::env::var(key).ok());

        Self {
            settings,
            settings_path,
        }
    }

    /// Directory holding settings and the key-value store.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("Esp32Remote");
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = Self::config_dir()?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
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

    pub fn set_dark_mode(&mut self, dark_mode: bool) -> anyhow::Result<()> {
        if self.settings.dark_mode != dark_mode {
            self.settings.dark_mode = dark_mode;
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("esp32_remote-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let path = scratch_file("settings.json");
        fs::write(&path, r#"{ "ble": { "scan_timeout_secs": 5 }, "dark_mode": true }"#).unwrap();

        let service = SettingsService::at(path);
        let settings = service.get();
        assert_eq!(settings.ble.scan_timeout_secs, 5);
        assert_eq!(settings.ble.trigger_payload, b'1');
        assert_eq!(settings.ble.trigger_label, "GPIO 27");
        assert_eq!(settings.oauth.scopes, vec!["profile", "email"]);
        assert_eq!(settings.log_settings.rotation, "daily");
        assert!(settings.dark_mode);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = scratch_file("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let service = SettingsService::at(path);
        assert_eq!(service.get().ble.scan_timeout_secs, 10);
    }

    #[test]
    fn save_round_trips_through_disk() {
        let path = scratch_file("settings.json");
        let mut service = SettingsService::at(path.clone());
        service.set_dark_mode(true).unwrap();

        let reloaded = SettingsService::at(path);
        assert!(reloaded.get().dark_mode);
    }

    #[test]
    fn env_overrides_client_credentials() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_WEB_CLIENT_ID, "web-id"),
            (ENV_IOS_CLIENT_ID, "  "),
            (ENV_CLIENT_SECRET, "shh"),
        ]);

        let mut oauth = OAuthSettings::default();
        oauth.client_ids.ios = Some("from-file".to_string());
        oauth.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(oauth.client_ids.for_os("linux"), Some("web-id"));
        assert_eq!(oauth.client_ids.for_os("ios"), Some("from-file"));
        assert_eq!(oauth.client_ids.for_os("android"), None);
        assert_eq!(oauth.client_secret.as_deref(), Some("shh"));
    }
}
