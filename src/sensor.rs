// src/sensor.rs
//! Accelerometer readings and a file-backed accelerometer stream

use crate::{
    error::{Result, TrackerError},
    gps::replay::read_json_lines,
    provider::{AccelerometerStream, EventSink, Subscription},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Three-axis acceleration in g
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelerometerReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerometerReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Replays recorded readings, one per update interval
pub struct ReplayAccelerometer {
    path: PathBuf,
    interval_ms: u64,
}

impl ReplayAccelerometer {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            interval_ms: 1000,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

impl AccelerometerStream for ReplayAccelerometer {
    fn set_update_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms.max(1);
    }

    fn subscribe(&mut self, sink: EventSink) -> Result<Subscription> {
        let readings: Vec<AccelerometerReading> = read_json_lines(&self.path)
            .map_err(|e| TrackerError::ProviderUnavailable(format!("accelerometer replay: {}", e)))?;
        let period = Duration::from_millis(self.interval_ms);
        log::debug!(
            "Replaying {} accelerometer readings from {}",
            readings.len(),
            self.path.display()
        );

        let task_sink = sink.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            for reading in readings {
                ticker.tick().await;
                if !task_sink.send_acceleration(reading) {
                    break;
                }
            }
        });

        Ok(Subscription::new(&sink, Some(task)))
    }
}
