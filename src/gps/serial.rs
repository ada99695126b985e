// src/gps/serial.rs
//! NMEA receivers on a serial port

use super::{data::Position, nmea};
use crate::{
    error::{Result, TrackerError},
    provider::{
        CadenceFilter, EventSink, LocationProvider, PermissionStatus, Subscription, WatchOptions,
    },
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

const FIRST_FIX_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SerialProvider {
    port: String,
    baudrate: u32,
}

impl SerialProvider {
    pub fn new(port: impl Into<String>, baudrate: u32) -> Self {
        Self {
            port: port.into(),
            baudrate,
        }
    }

    fn open(&self) -> std::result::Result<SerialStream, tokio_serial::Error> {
        tokio_serial::new(&self.port, self.baudrate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
    }
}

/// Read NMEA lines until the first valid fix
pub async fn read_first_fix<R: AsyncRead + Unpin>(reader: R) -> Result<Position> {
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(TrackerError::ProviderUnavailable("NMEA stream ended before a fix".to_string()));
        }
        if let Some(position) = nmea::parse_nmea_sentence(line.trim()) {
            return Ok(position);
        }
    }
}

/// Forward fixes from an NMEA stream into `sink` until cancelled or the stream ends
pub async fn forward_fixes<R: AsyncRead + Unpin>(reader: R, options: WatchOptions, sink: EventSink) {
    let mut reader = BufReader::new(reader);
    let mut filter = CadenceFilter::new(&options);
    let mut line = String::new();

    while sink.is_active() {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                sink.send_error("serial stream ended");
                break;
            }
            Ok(_) => {
                if let Some(position) = nmea::parse_nmea_sentence(line.trim()) {
                    if filter.accept(&position) && !sink.send_position(position) {
                        break;
                    }
                }
            }
            Err(e) => {
                sink.send_error(format!("Error reading from serial port: {}", e));
                break;
            }
        }
    }
}

#[async_trait]
impl LocationProvider for SerialProvider {
    fn name(&self) -> &str {
        "serial"
    }

    async fn request_permission(&mut self) -> Result<PermissionStatus> {
        match self.open() {
            Ok(_) => Ok(PermissionStatus::Granted),
            Err(e) => match e.kind {
                tokio_serial::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                    log::warn!("No permission to open {}: {}", self.port, e);
                    Ok(PermissionStatus::Denied)
                }
                _ => Err(TrackerError::ProviderUnavailable(format!(
                    "Failed to open serial port {}: {}",
                    self.port, e
                ))),
            },
        }
    }

    async fn current_position(&mut self) -> Result<Position> {
        let serial = self.open()?;
        tokio::time::timeout(FIRST_FIX_TIMEOUT, read_first_fix(serial))
            .await
            .map_err(|_| TrackerError::ProviderUnavailable(format!("timed out waiting for a fix on {}", self.port)))?
    }

    fn watch_position(&mut self, options: WatchOptions, sink: EventSink) -> Result<Subscription> {
        let serial = self.open().map_err(|e| {
            TrackerError::ProviderUnavailable(format!("Failed to open serial port {}: {}", self.port, e))
        })?;
        log::info!("Reading NMEA from {} at {} baud", self.port, self.baudrate);

        let task = tokio::spawn(forward_fixes(serial, options, sink.clone()));
        Ok(Subscription::new(&sink, Some(task)))
    }
}

/// List available serial ports
pub fn list_serial_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| TrackerError::Other(format!("Failed to list serial ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .map(|port| format!("{} - {:?}", port.port_name, port.port_type))
        .collect())
}
