// src/gps/replay.rs
//! Recorded tracks replayed from JSON-lines files

use super::data::Position;
use crate::{
    error::{Result, TrackerError},
    provider::{
        CadenceFilter, EventSink, LocationProvider, PermissionStatus, Subscription, WatchOptions,
    },
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Read one JSON record per non-empty line
pub fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let contents = std::fs::read_to_string(path)?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                TrackerError::Parse(format!("{} line {}: {}", path.display(), index + 1, e))
            })
        })
        .collect()
}

pub struct ReplayProvider {
    path: PathBuf,
}

impl ReplayProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<Vec<Position>> {
        read_json_lines(&self.path)
            .map_err(|e| TrackerError::ProviderUnavailable(format!("replay: {}", e)))
    }
}

#[async_trait]
impl LocationProvider for ReplayProvider {
    fn name(&self) -> &str {
        "replay"
    }

    async fn request_permission(&mut self) -> Result<PermissionStatus> {
        match std::fs::metadata(&self.path) {
            Ok(_) => Ok(PermissionStatus::Granted),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(PermissionStatus::Denied),
            Err(e) => Err(TrackerError::ProviderUnavailable(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn current_position(&mut self) -> Result<Position> {
        self.load()?
            .into_iter()
            .next()
            .ok_or_else(|| TrackerError::ProviderUnavailable(format!("{} is empty", self.path.display())))
    }

    fn watch_position(&mut self, options: WatchOptions, sink: EventSink) -> Result<Subscription> {
        let positions = self.load()?;
        let period = Duration::from_millis(options.interval_ms.max(1));
        log::info!("Replaying {} fixes from {}", positions.len(), self.path.display());

        let task_sink = sink.clone();
        let task = tokio::spawn(async move {
            let mut filter = CadenceFilter::new(&options);
            let mut ticker = tokio::time::interval(period);
            for position in positions {
                if !filter.accept(&position) {
                    continue;
                }
                ticker.tick().await;
                if !task_sink.send_position(position) {
                    return;
                }
            }
            task_sink.send_error("replay finished");
        });

        Ok(Subscription::new(&sink, Some(task)))
    }
}
