// src/display/mod.rs
//! Display surfaces for a tracking session

pub mod plain;
pub mod terminal;

use crate::{error::Result, gps::Position, session::SessionSnapshot};

/// Surface that shows live metrics and keeps the map centered on the latest fix
pub trait TrackingDisplay {
    fn render(&mut self, snapshot: &SessionSnapshot) -> Result<()>;

    /// Show a message the user has to see, e.g. a refused permission
    fn notice(&mut self, message: &str) -> Result<()>;

    /// Restore the output device
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One-line summary shared by the plain display and the terminal footer
pub fn format_status_line(snapshot: &SessionSnapshot) -> String {
    let metrics = &snapshot.metrics;
    let center = match snapshot.camera_center() {
        Some(p) => format_lat_lon(&p),
        None => "no fix".to_string(),
    };
    format!(
        "[{}] {:.2} km | {:.2} km/h | {} steps | @ {}",
        snapshot.state,
        metrics.distance_km(),
        metrics.speed_kmh(),
        metrics.step_count,
        center
    )
}

pub fn format_lat_lon(position: &Position) -> String {
    format!("{:.6}, {:.6}", position.latitude, position.longitude)
}
