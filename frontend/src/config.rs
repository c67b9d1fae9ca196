//! Configuration file handling.
//!
//! Settings live in `lumen.toml` under the platform config directory and
//! are merged with command-line overrides in `main`. A missing or broken
//! file falls back to defaults with a warning rather than refusing to run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NetplayConfig {
    pub enabled: bool,
    /// Local player id, 0-9.
    pub id: u8,
    pub server_port: u16,
    pub hard_sync: bool,
    /// Allowed drift between peers, in CPU cycles.
    pub sync_threshold: u32,
}

impl Default for NetplayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            id: 0,
            server_port: 2000,
            hard_sync: true,
            sync_threshold: 32,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub use_bios: bool,
    pub bios_path: Option<PathBuf>,
    /// Simulate LCD persistence with a third gray shade.
    pub lcd_blend: bool,
    /// Refresh the EEPROM RTC snapshot from host time at load.
    pub rtc_snapshot: bool,
    /// Keep one EEPROM image per ROM instead of a shared one.
    pub per_rom_eeprom: bool,
    pub ignore_illegal_opcodes: bool,
    /// Master volume, 0-128.
    pub volume: u8,
    pub sample_rate: u32,
    pub scale: u32,
    pub netplay: NetplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_bios: true,
            bios_path: None,
            lcd_blend: true,
            rtc_snapshot: true,
            per_rom_eeprom: false,
            ignore_illegal_opcodes: false,
            volume: 128,
            sample_rate: 44100,
            scale: 4,
            netplay: NetplayConfig::default(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lumen").join("lumen.toml"))
}

/// Directory for EEPROM saves and save states.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("lumen"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };

    match std::fs::read_to_string(&path) {
        Ok(text) => match toml::from_str(&text) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("could not parse {}: {err}", path.display());
                Config::default()
            }
        },
        Err(_) => Config::default(),
    }
}

/// Write the current configuration back out (first-run convenience).
pub fn save(config: &Config) {
    let Some(path) = config_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match toml::to_string_pretty(config) {
        Ok(text) => {
            if let Err(err) = std::fs::write(&path, text) {
                log::warn!("could not write {}: {err}", path.display());
            }
        }
        Err(err) => log::warn!("could not serialize configuration: {err}"),
    }
}
