// src/lib.rs
//! GPS Tracker Library
//!
//! A fitness tracking session that turns a stream of position fixes into
//! distance and speed and accelerometer readings into a step count, with
//! start/pause/resume/stop controls and pluggable location sources.

pub mod config;
pub mod display;
pub mod error;
pub mod geo;
pub mod gps;
pub mod provider;
pub mod sensor;
pub mod session;
pub mod tracker;

// Re-export main types for convenience
pub use error::{Result, TrackerError};
pub use geo::haversine_distance;
pub use gps::Position;
pub use provider::{Command, EventSender, LocationProvider, TrackingEvent};
pub use session::{SessionMetrics, SessionSnapshot, SessionSummary, TrackingSession, TrackingState};
pub use tracker::Tracker;
