//! Configuration file management.
//!
//! Handles loading and saving user preferences to `~/.wavescene.toml`. The
//! persisted snapshot has exactly the shape the engine consumes; persistence
//! is an opaque same-shape boundary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::settings::Settings;

const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 3;

const CONFIG_TEMPLATE: &str = r#"# wavescene configuration file

# Timeout in seconds when opening audio devices (default: 3)
# device_timeout_secs = 3

# Last selected input device (auto-saved)
# last_device = "Device Name"

# The full settings snapshot (style, theme, transform, overlays,
# post-processing, export) is saved under [settings] when you press
# the save key and restored on startup.
"#;

#[derive(Serialize, Deserialize, Default)]
pub struct Config {
    pub last_device: Option<String>,
    pub device_timeout_secs: Option<u64>,
    pub settings: Option<Settings>,
}

impl Config {
    fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".wavescene.toml"))
    }

    pub fn load() -> Self {
        let path = match Self::path() {
            Some(p) => p,
            None => return Self::default(),
        };

        // Create template file if it doesn't exist
        if !path.exists() {
            let _ = fs::write(&path, CONFIG_TEMPLATE);
            println!("Created config template at {:?}", path);
        }

        fs::read_to_string(&path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn device_timeout_secs(&self) -> u64 {
        self.device_timeout_secs
            .unwrap_or(DEFAULT_DEVICE_TIMEOUT_SECS)
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            if let Ok(content) = toml::to_string(self) {
                let _ = fs::write(&path, &content);
                println!("Config saved to {:?}", path);
            }
        }
    }

    pub fn set_device(&mut self, name: &str) {
        self.last_device = Some(name.to_string());
        self.save();
    }

    /// Initial snapshot for the engine: the saved one, or defaults.
    pub fn settings_or_default(&self) -> Settings {
        self.settings.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::styles::StyleId;

    #[test]
    fn settings_snapshot_round_trips_through_toml() {
        let mut settings = Settings::default();
        settings.style = StyleId::Starfield;
        settings.theme.primary_color = [1, 2, 3];
        settings.transform.rotation = -45.0;
        settings.post.chromatic_aberration.enabled = true;
        settings.export.frame_rate = 60;

        let config = Config {
            last_device: Some("pipewire".to_string()),
            device_timeout_secs: None,
            settings: Some(settings),
        };

        let text = toml::to_string(&config).expect("serialize");
        let back: Config = toml::from_str(&text).expect("deserialize");
        let restored = back.settings_or_default();
        assert_eq!(restored.style, StyleId::Starfield);
        assert_eq!(restored.theme.primary_color, [1, 2, 3]);
        assert_eq!(restored.transform.rotation, -45.0);
        assert!(restored.post.chromatic_aberration.enabled);
        assert_eq!(restored.export.frame_rate, 60);
        assert_eq!(back.last_device.as_deref(), Some("pipewire"));
    }

    #[test]
    fn missing_settings_defaults() {
        let back: Config = toml::from_str("last_device = \"pulse\"").expect("deserialize");
        let restored = back.settings_or_default();
        assert_eq!(restored.style, StyleId::default());
        assert_eq!(back.device_timeout_secs(), DEFAULT_DEVICE_TIMEOUT_SECS);
    }
}
