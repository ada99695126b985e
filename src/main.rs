// src/main.rs
//! GPS Tracker - terminal fitness tracker over gpsd, NMEA serial or replayed tracks

use anyhow::Context;
use clap::Parser;
use gps_tracker::{
    config::TrackerConfig,
    display::{plain::PlainDisplay, terminal::TerminalDisplay},
    gps::{self, serial::list_serial_ports},
    provider::{AccelerometerStream, Command, EventSender},
    sensor::ReplayAccelerometer,
    tracker::{spawn_keyboard, spawn_line_input, RawModeGuard, Tracker},
    SessionSummary, TrackingSession,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gps-tracker", version, about = "Track speed, distance and steps from a GPS source")]
struct Args {
    /// Location source
    #[arg(long, value_parser = ["gpsd", "serial", "replay"])]
    source: Option<String>,

    /// gpsd host
    #[arg(long)]
    host: Option<String>,

    /// gpsd port
    #[arg(long)]
    port: Option<u16>,

    /// Serial device of an NMEA receiver
    #[arg(long)]
    device: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// JSON-lines file of recorded positions
    #[arg(long)]
    replay: Option<PathBuf>,

    /// JSON-lines file of accelerometer readings used for step counting
    #[arg(long)]
    accel: Option<PathBuf>,

    /// Requested interval between position updates
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Acceleration magnitude in g that counts as a step
    #[arg(long)]
    step_threshold: Option<f64>,

    /// Print one status line per update instead of the full-screen view
    #[arg(long)]
    plain: bool,

    /// Start tracking immediately
    #[arg(long)]
    autostart: bool,

    /// Print the last session summary as JSON on exit
    #[arg(long)]
    json: bool,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Persist the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,
}

impl Args {
    fn apply(&self, config: &mut TrackerConfig) {
        if let Some(ref source) = self.source {
            config.update_source(source);
        }
        if let Some(ref host) = self.host {
            config.gpsd_host = Some(host.clone());
        }
        if let Some(port) = self.port {
            config.gpsd_port = Some(port);
        }
        if let Some(ref device) = self.device {
            config.serial_port = Some(device.clone());
        }
        if let Some(baud) = self.baud {
            config.serial_baudrate = Some(baud);
        }
        if let Some(ref path) = self.replay {
            config.replay_path = Some(path.clone());
        }
        if let Some(ref path) = self.accel {
            config.accel_path = Some(path.clone());
        }
        if let Some(interval) = self.interval_ms {
            config.interval_ms = interval;
        }
        if let Some(threshold) = self.step_threshold {
            config.step_threshold = threshold;
        }
    }
}

/// Log lines on stderr would tear the full-screen view, so it only gets warnings
fn default_log_filter(plain: bool) -> &'static str {
    if plain {
        "info"
    } else {
        "warn"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_log_filter(args.plain)))
        .init();

    if args.list_ports {
        let ports = list_serial_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        } else {
            println!("Available serial ports:");
            for port in ports {
                println!("  {}", port);
            }
        }
        return Ok(());
    }

    let mut config = TrackerConfig::load().unwrap_or_else(|e| {
        log::warn!("{}, using defaults", e);
        TrackerConfig::default()
    });
    args.apply(&mut config);
    if args.save_config {
        config.save().context("saving configuration")?;
    }

    log::info!("Using {} source", config.source_type);
    let provider = gps::provider_from_config(&config)?;
    let accelerometer = config
        .accel_path
        .as_ref()
        .map(|path| Box::new(ReplayAccelerometer::new(path)) as Box<dyn AccelerometerStream>);

    let (events, rx) = EventSender::channel();
    let session = TrackingSession::activate(provider, accelerometer, events.clone(), &config)
        .await
        .context("activating tracking session")?;
    if args.autostart {
        events.send_command(Command::Start);
    }

    let summary = if args.plain {
        let tracker = Tracker::new(session, events, rx, PlainDisplay::stdout());
        // detached, see spawn_line_input
        let _input = spawn_line_input(tracker.commands());
        tracker.run().await?
    } else {
        run_interactive(session, events, rx).await?
    };

    if let Some(summary) = summary {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "Session: {:.2} km, {} steps, {}",
                summary.metrics.distance_km(),
                summary.metrics.step_count,
                summary.format_duration()
            );
        }
    }

    Ok(())
}

async fn run_interactive(
    session: TrackingSession,
    events: EventSender,
    rx: tokio::sync::mpsc::UnboundedReceiver<gps_tracker::TrackingEvent>,
) -> anyhow::Result<Option<SessionSummary>> {
    let tracker = Tracker::new(session, events, rx, TerminalDisplay::stdout());
    let raw_mode = RawModeGuard::enable().context("enabling raw terminal mode")?;
    let keyboard = spawn_keyboard(tracker.commands(), tracker.running_flag());

    let summary = tracker.run().await;
    drop(raw_mode);
    if keyboard.join().is_err() {
        log::warn!("Keyboard thread panicked");
    }

    Ok(summary?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_screen_logs_only_warnings() {
        assert_eq!(default_log_filter(false), "warn");
        assert_eq!(default_log_filter(true), "info");
    }

    #[test]
    fn test_plain_flag_parses() {
        let args = Args::parse_from(["gps-tracker", "--plain", "--source", "replay"]);
        assert!(args.plain);
        assert_eq!(args.source.as_deref(), Some("replay"));
    }
}
