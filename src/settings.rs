use dirs_next as dirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::DEFAULT_API_URL;

const API_URL_ENV: &str = "HEALTH_API_URL";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Persistent user configuration.
///
/// Stored as JSON in the platform config directory. Every field has a serde
/// default so files written by older versions still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Base URL of the export backend.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Check the export status as soon as the window opens.
    #[serde(default = "default_true")]
    pub connect_on_start: bool,
    #[serde(default)]
    pub last_upload_dir: Option<String>,
    #[serde(default)]
    pub last_export_dir: Option<String>,
}

impl Settings {
    const FILE: &'static str = "apple_health_viewer_settings.json";

    pub fn path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings from disk, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring malformed settings at {}: {e}", path.display()),
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match serde_json::to_string_pretty(self) {
                Ok(data) => {
                    if let Err(e) = std::fs::write(&path, data) {
                        log::error!("Failed to save settings: {e}");
                    }
                }
                Err(e) => log::error!("Failed to serialize settings: {e}"),
            }
        }
    }

    /// Backend URL to use. `HEALTH_API_URL` takes precedence over the stored
    /// value.
    pub fn effective_api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.api_url.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_timeout_secs(),
            connect_on_start: true,
            last_upload_dir: None,
            last_export_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::env;
    use std::sync::Mutex;

    static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn settings_roundtrip() {
        let s = Settings {
            api_url: "http://example.test:8080".into(),
            request_timeout_secs: 5,
            connect_on_start: false,
            last_upload_dir: Some("/tmp/exports".into()),
            last_export_dir: Some("/tmp/out".into()),
        };
        let json = serde_json::to_string(&s).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, loaded);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let loaded: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded, Settings::default());
        assert!(loaded.connect_on_start);
    }

    #[test]
    fn persists_to_config_dir() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let prev_config = env::var_os("XDG_CONFIG_HOME");
        unsafe {
            env::set_var("XDG_CONFIG_HOME", dir.path());
        }

        let mut s = Settings::default();
        s.api_url = "http://127.0.0.1:9000".into();
        s.save();
        assert_eq!(Settings::load().api_url, "http://127.0.0.1:9000");

        std::fs::write(Settings::path().unwrap(), "not json").unwrap();
        assert_eq!(Settings::load(), Settings::default());

        if let Some(val) = prev_config {
            unsafe {
                env::set_var("XDG_CONFIG_HOME", val);
            }
        } else {
            unsafe {
                env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn env_var_overrides_stored_url() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let s = Settings::default();
        unsafe {
            env::set_var(API_URL_ENV, "http://forced:5000");
        }
        assert_eq!(s.effective_api_url(), "http://forced:5000");
        unsafe {
            env::remove_var(API_URL_ENV);
        }
        assert_eq!(s.effective_api_url(), DEFAULT_API_URL);
        assert_eq!(s.request_timeout(), Duration::from_secs(30));
    }
}
