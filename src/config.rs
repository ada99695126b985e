// src/config.rs
//! Configuration management

use crate::{
    error::{Result, TrackerError},
    provider::WatchOptions,
    session::DEFAULT_STEP_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub source_type: String, // "gpsd", "serial", "replay"
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub replay_path: Option<PathBuf>,
    pub accel_path: Option<PathBuf>,
    pub interval_ms: u64,
    pub min_distance_m: f64,
    pub step_threshold: f64,
    pub accel_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            source_type: "gpsd".to_string(),
            gpsd_host: Some("localhost".to_string()),
            gpsd_port: Some(2947),
            serial_port: None,
            serial_baudrate: Some(9600),
            replay_path: None,
            accel_path: None,
            interval_ms: 1000,
            min_distance_m: 0.0,
            step_threshold: DEFAULT_STEP_THRESHOLD,
            accel_interval_ms: 1000,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from the user config file, defaults if absent
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| TrackerError::Other(format!("Failed to read config file: {}", e)))?;

        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| TrackerError::Other(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackerError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| TrackerError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| TrackerError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| TrackerError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("gps-tracker").join("config.json"))
    }

    /// Watch options for a fitness session
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            interval_ms: self.interval_ms,
            min_distance_m: self.min_distance_m.max(0.0),
            ..WatchOptions::default()
        }
    }

    pub fn update_source(&mut self, source_type: &str) {
        self.source_type = source_type.to_string();
    }

    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.source_type = "gpsd".to_string();
        self.gpsd_host = Some(host);
        self.gpsd_port = Some(port);
    }

    pub fn update_replay(&mut self, path: PathBuf) {
        self.source_type = "replay".to_string();
        self.replay_path = Some(path);
    }
}
