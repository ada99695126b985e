// src/gps/mod.rs
//! Position fixes and the location sources that produce them

pub mod data;
pub mod gpsd;
pub mod nmea;
pub mod replay;
pub mod serial;

pub use data::Position;
pub use gpsd::GpsdProvider;
pub use replay::ReplayProvider;
pub use serial::SerialProvider;

use crate::{
    config::TrackerConfig,
    error::{Result, TrackerError},
    provider::LocationProvider,
};

/// Build the location source named by `config.source_type`
pub fn provider_from_config(config: &TrackerConfig) -> Result<Box<dyn LocationProvider>> {
    match config.source_type.as_str() {
        "gpsd" => {
            let host = config.gpsd_host.clone().unwrap_or_else(|| "localhost".to_string());
            let port = config.gpsd_port.unwrap_or(2947);
            Ok(Box::new(GpsdProvider::new(host, port)))
        }
        "serial" => {
            let port = config
                .serial_port
                .clone()
                .ok_or_else(|| TrackerError::Other("No serial port configured (use --device)".to_string()))?;
            Ok(Box::new(SerialProvider::new(port, config.serial_baudrate.unwrap_or(9600))))
        }
        "replay" => {
            let path = config
                .replay_path
                .as_ref()
                .ok_or_else(|| TrackerError::Other("No replay file configured (use --replay)".to_string()))?;
            Ok(Box::new(ReplayProvider::new(path)))
        }
        other => Err(TrackerError::Other(format!("Unknown source type: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_config() {
        let mut config = TrackerConfig::default();
        assert_eq!(provider_from_config(&config).unwrap().name(), "gpsd");

        config.update_source("serial");
        assert!(provider_from_config(&config).is_err());
        config.update_serial("/dev/ttyUSB0".to_string(), 4800);
        assert_eq!(provider_from_config(&config).unwrap().name(), "serial");

        config.update_replay("run.jsonl".into());
        assert_eq!(provider_from_config(&config).unwrap().name(), "replay");

        config.update_source("windows");
        assert!(provider_from_config(&config).is_err());
    }
}
