// src/gps/gpsd.rs
//! GPSD client and location provider

use super::data::Position;
use crate::{
    error::{Result, TrackerError},
    provider::{
        CadenceFilter, EventSink, LocationProvider, PermissionStatus, Subscription, WatchOptions,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};

const FIRST_FIX_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// Connect to a gpsd daemon and return a stream reader
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to connect to gpsd at {}:{}: {}", host, port, e)))?;

    // Send WATCH command to start receiving JSON data
    let watch_cmd = "?WATCH={\"enable\":true,\"json\":true}\n";
    stream
        .write_all(watch_cmd.as_bytes())
        .await
        .map_err(|e| TrackerError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Parse a single line of gpsd JSON data, returning a fix for TPV reports that carry one
pub fn parse_gpsd_json(line: &str) -> Result<Option<Position>> {
    let msg: GpsdMessage = serde_json::from_str(line)
        .map_err(|e| TrackerError::Parse(format!("Failed to parse gpsd JSON: {}", e)))?;

    let position = match msg.class.as_str() {
        "TPV" => parse_tpv_message(&msg.data),
        "VERSION" => {
            parse_version_message(&msg.data);
            None
        }
        "DEVICES" => {
            parse_devices_message(&msg.data);
            None
        }
        _ => None,
    };

    Ok(position)
}

/// Parse TPV (Time Position Velocity) message
fn parse_tpv_message(msg_data: &HashMap<String, serde_json::Value>) -> Option<Position> {
    let lat = msg_data.get("lat").and_then(|v| v.as_f64())?;
    let lon = msg_data.get("lon").and_then(|v| v.as_f64())?;

    // gpsd already reports m/s
    let speed = msg_data.get("speed").and_then(|v| v.as_f64()).unwrap_or(0.0);

    let timestamp_ms = msg_data
        .get("time")
        .and_then(|v| v.as_str())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc).timestamp_millis())
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    Some(Position::new(lat, lon, timestamp_ms, speed))
}

/// Parse VERSION message (informational)
fn parse_version_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(version) = msg_data.get("release").and_then(|v| v.as_str()) {
        log::info!("Connected to gpsd version: {}", version);
    }
}

/// Parse DEVICES message (informational)
fn parse_devices_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(devices) = msg_data.get("devices").and_then(|v| v.as_array()) {
        log::info!("gpsd managing {} device(s)", devices.len());
        for device in devices {
            if let Some(path) = device.get("path").and_then(|v| v.as_str()) {
                log::debug!("  Device: {}", path);
            }
        }
    }
}

/// Location provider backed by a gpsd daemon
pub struct GpsdProvider {
    host: String,
    port: u16,
}

impl GpsdProvider {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    async fn first_fix(&self) -> Result<Position> {
        let mut reader = connect_gpsd(&self.host, self.port).await?;
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Err(TrackerError::Connection("gpsd closed the connection".to_string()));
            }
            match parse_gpsd_json(line.trim()) {
                Ok(Some(position)) => return Ok(position),
                Ok(None) => {}
                Err(e) => log::debug!("{}", e),
            }
        }
    }
}

#[async_trait]
impl LocationProvider for GpsdProvider {
    fn name(&self) -> &str {
        "gpsd"
    }

    async fn request_permission(&mut self) -> Result<PermissionStatus> {
        // gpsd serves any local client
        Ok(PermissionStatus::Granted)
    }

    async fn current_position(&mut self) -> Result<Position> {
        tokio::time::timeout(FIRST_FIX_TIMEOUT, self.first_fix())
            .await
            .map_err(|_| TrackerError::ProviderUnavailable("timed out waiting for a gpsd fix".to_string()))?
    }

    fn watch_position(&mut self, options: WatchOptions, sink: EventSink) -> Result<Subscription> {
        let host = self.host.clone();
        let port = self.port;
        let task_sink = sink.clone();
        log::debug!(
            "Watching gpsd at {}:{} every {} ms ({:?}, {:?})",
            host,
            port,
            options.interval_ms,
            options.accuracy,
            options.activity
        );

        let task = tokio::spawn(async move {
            let mut reader = match connect_gpsd(&host, port).await {
                Ok(reader) => reader,
                Err(e) => {
                    task_sink.send_error(e.to_string());
                    return;
                }
            };
            let mut filter = CadenceFilter::new(&options);
            let mut line = String::new();

            while task_sink.is_active() {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        task_sink.send_error("gpsd closed the connection");
                        break;
                    }
                    Ok(_) => match parse_gpsd_json(line.trim()) {
                        Ok(Some(position)) => {
                            if filter.accept(&position) && !task_sink.send_position(position) {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => log::debug!("{}", e),
                    },
                    Err(e) => {
                        task_sink.send_error(format!("Error reading from gpsd: {}", e));
                        break;
                    }
                }
            }
        });

        Ok(Subscription::new(&sink, Some(task)))
    }
}
