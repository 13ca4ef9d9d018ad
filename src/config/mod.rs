use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::{ToneConfig, DEFAULT_FREQUENCY_HZ};
use crate::cw::{TimingModel, DEFAULT_WPM};
use crate::error::{EngineError, Result};
use crate::flash::FlashColor;

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Timing
    pub wpm: u32,

    // Flash settings
    pub flash_color: FlashColor,

    // Tone settings
    pub tone_frequency: f32,
    pub tone_volume: f32,
    pub fade_ms: u32,

    // Device settings
    pub output_device: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wpm: DEFAULT_WPM,
            flash_color: FlashColor::default(),
            tone_frequency: DEFAULT_FREQUENCY_HZ,
            tone_volume: 0.5,
            fade_ms: 5,
            output_device: None,
        }
    }
}

impl Settings {
    /// Get the path to the settings file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("morse-beacon");
            path.push("settings.json");
            path
        })
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("[settings] Could not determine config path");
                Self::default()
            }
        }
    }

    /// Load settings from `path`; any problem falls back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("[settings] {:?} does not exist, using defaults", path);
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("[settings] Failed to read config file: {}", e);
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => {
                info!("[settings] Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                warn!("[settings] Failed to parse config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| EngineError::Settings("Could not determine config directory".to_string()))?;
        self.save_to(&path)
    }

    /// Save settings to `path`, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        info!("[settings] Saving to {:?}", path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| EngineError::Settings(format!("Failed to create config dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Settings(format!("Failed to serialize settings: {e}")))?;

        // Write with explicit sync to ensure data reaches disk
        let mut file = fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        Ok(())
    }

    /// Timing for the configured rate (clamped)
    pub fn timing(&self) -> TimingModel {
        TimingModel::from_rate(self.wpm)
    }

    /// Tone parameters for opening an audio output
    pub fn tone_config(&self) -> ToneConfig {
        ToneConfig {
            frequency: self.tone_frequency,
            volume: self.tone_volume.clamp(0.0, 1.0),
            fade: Duration::from_millis(u64::from(self.fade_ms)),
            device: self.output_device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            wpm: 32,
            flash_color: FlashColor::Yellow,
            output_device: Some("USB Audio".to_string()),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_missing_or_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(Settings::load_from(&path), Settings::default());

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "wpm": 12, "flash_color": "Blue" }"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.wpm, 12);
        assert_eq!(settings.flash_color, FlashColor::Blue);
        assert_eq!(settings.tone_frequency, DEFAULT_FREQUENCY_HZ);
    }

    #[test]
    fn test_derived_configs() {
        let settings = Settings {
            wpm: 99,
            tone_volume: 3.0,
            ..Settings::default()
        };
        assert_eq!(settings.timing().rate(), 50);
        let tone = settings.tone_config();
        assert_eq!(tone.volume, 1.0);
        assert_eq!(tone.fade, Duration::from_millis(5));
    }
}
