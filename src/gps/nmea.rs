// src/gps/nmea.rs
//! NMEA sentence parsing

use super::data::Position;
use chrono::{NaiveDate, NaiveTime, Utc};

const KNOTS_TO_MPS: f64 = 0.514_444;

/// Parse a single NMEA sentence, returning a fix for valid RMC sentences
pub fn parse_nmea_sentence(line: &str) -> Option<Position> {
    if !checksum_ok(line) {
        log::debug!("Bad NMEA checksum: {}", line);
        return None;
    }

    let body = line.split('*').next().unwrap_or(line);
    let parts: Vec<&str> = body.split(',').collect();

    if line.starts_with("$GPRMC") || line.starts_with("$GNRMC") {
        parse_rmc(&parts)
    } else {
        None
    }
}

/// Validate the `*hh` checksum when the sentence carries one
pub fn checksum_ok(line: &str) -> bool {
    let Some(body) = line.strip_prefix('$') else {
        return false;
    };
    match body.split_once('*') {
        Some((payload, checksum)) => {
            let expected = match u8::from_str_radix(checksum.trim(), 16) {
                Ok(value) => value,
                Err(_) => return false,
            };
            payload.bytes().fold(0u8, |acc, b| acc ^ b) == expected
        }
        None => true,
    }
}

/// Parse RMC (Recommended Minimum) sentence
fn parse_rmc(parts: &[&str]) -> Option<Position> {
    if parts.len() < 10 {
        return None;
    }

    // Status (field 2): A = valid, V = warning
    if parts[2] != "A" {
        return None;
    }

    let latitude = parse_coordinate(parts[3], parts[4], "S")?;
    let longitude = parse_coordinate(parts[5], parts[6], "W")?;

    // Speed over ground in knots (field 7)
    let speed = parts[7]
        .parse::<f64>()
        .map(|knots| knots * KNOTS_TO_MPS)
        .unwrap_or(0.0);

    let timestamp_ms = parse_timestamp(parts[1], parts[9]).unwrap_or_else(|| Utc::now().timestamp_millis());

    Some(Position::new(latitude, longitude, timestamp_ms, speed))
}

/// Convert ddmm.mmmm / dddmm.mmmm into signed decimal degrees
fn parse_coordinate(value: &str, hemisphere: &str, negative: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }
    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;

    Some(if hemisphere == negative { -decimal } else { decimal })
}

/// hhmmss(.sss) and ddmmyy into Unix milliseconds
fn parse_timestamp(time: &str, date: &str) -> Option<i64> {
    let time = NaiveTime::parse_from_str(time, "%H%M%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H%M%S"))
        .ok()?;
    let date = NaiveDate::parse_from_str(date, "%d%m%y").ok()?;
    Some(date.and_time(time).and_utc().timestamp_millis())
}
