// src/gps/data.rs
//! Position fixes and utilities

use crate::geo::haversine_distance;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single position fix as delivered by a location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
    /// Ground speed in m/s, 0 when the provider does not report one
    #[serde(default)]
    pub speed: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64, speed: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            speed,
        }
    }

    /// Build a fix stamped with the current time
    pub fn now(latitude: f64, longitude: f64, speed: Option<f64>) -> Self {
        Self::new(latitude, longitude, Utc::now().timestamp_millis(), speed.unwrap_or(0.0))
    }

    /// Great-circle distance to another fix in meters
    pub fn distance_to(&self, other: &Position) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Speed with NaN and negative values mapped to 0
    pub fn sanitized_speed(&self) -> f64 {
        if self.speed.is_finite() && self.speed > 0.0 {
            self.speed
        } else {
            0.0
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }

    /// Format coordinate for display
    pub fn format_coordinate(coord: Option<f64>) -> String {
        match coord {
            Some(val) => format!("{:>12.6}°", val),
            None => "No fix".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_speed() {
        assert_eq!(Position::new(0.0, 0.0, 0, 3.5).sanitized_speed(), 3.5);
        assert_eq!(Position::new(0.0, 0.0, 0, -1.0).sanitized_speed(), 0.0);
        assert_eq!(Position::new(0.0, 0.0, 0, f64::NAN).sanitized_speed(), 0.0);
    }

    #[test]
    fn test_missing_speed_deserializes_to_zero() {
        let p: Position =
            serde_json::from_str(r#"{"latitude":1.0,"longitude":2.0,"timestamp_ms":1000}"#).unwrap();
        assert_eq!(p.speed, 0.0);
        assert_eq!(p.timestamp().unwrap().timestamp_millis(), 1000);
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(Position::format_coordinate(None), "No fix");
        assert!(Position::format_coordinate(Some(-23.5)).contains("-23.500000"));
    }
}
