// src/display/terminal.rs
//! Terminal-based display implementation

use super::{format_lat_lon, TrackingDisplay};
use crate::{
    error::Result,
    gps::Position,
    session::{SessionSnapshot, TrackingState},
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::io::{self, Write};

// raw mode does not translate \n
const NL: &str = "\r\n";

pub struct TerminalDisplay<W: Write> {
    out: W,
    /// Shown until the session changes state
    notice: Option<String>,
    last_state: Option<TrackingState>,
    started: bool,
}

impl TerminalDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            notice: None,
            last_state: None,
            started: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render_frame(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        let out = &mut self.out;

        // Header
        queue!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print(NL),
            Print("GPS Tracker"),
            Print(NL),
            Print("=".repeat(60)),
            Print(NL),
            ResetColor
        )?;

        let (label, color) = state_style(snapshot.state);
        queue!(
            out,
            Print("Status: "),
            SetForegroundColor(color),
            Print(label),
            ResetColor,
            Print(NL),
            Print(NL)
        )?;

        // Metrics section
        let metrics = &snapshot.metrics;
        queue!(
            out,
            SetForegroundColor(Color::Cyan),
            Print("SESSION:"),
            Print(NL),
            ResetColor,
            Print(format!("  Speed:     {:>12.2} km/h ({:.2} m/s){}", metrics.speed_kmh(), metrics.current_speed, NL)),
            Print(format!("  Distance:  {:>12.2} km{}", metrics.distance_km(), NL)),
            Print(format!("  Steps:     {:>12}{}", metrics.step_count, NL)),
            Print(NL)
        )?;

        // Map section
        queue!(
            out,
            SetForegroundColor(Color::Yellow),
            Print("MAP:"),
            Print(NL),
            ResetColor,
            Print(format!("  Camera:    {}{}", describe(snapshot.camera_center()), NL)),
            Print(format!("  Start:     {}{}", describe(snapshot.initial_position), NL)),
            Print(format!("  Latitude:  {}{}", Position::format_coordinate(snapshot.current_position.map(|p| p.latitude)), NL)),
            Print(format!("  Longitude: {}{}", Position::format_coordinate(snapshot.current_position.map(|p| p.longitude)), NL)),
            Print(NL)
        )?;

        if let Some(ref notice) = self.notice {
            queue!(
                out,
                SetForegroundColor(Color::Red),
                Print(format!("!! {}{}{}", notice, NL, NL)),
                ResetColor
            )?;
        }

        // Footer
        queue!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print(NL),
            Print("[s] start  [p] pause  [r] resume  [x] stop  [q] quit"),
            Print(NL),
            ResetColor
        )?;

        Ok(())
    }
}

fn state_style(state: TrackingState) -> (&'static str, Color) {
    match state {
        TrackingState::Idle => ("IDLE", Color::Grey),
        TrackingState::Running => ("RUNNING", Color::Green),
        TrackingState::Paused => ("PAUSED", Color::Yellow),
        TrackingState::Stopped => ("STOPPED", Color::Red),
    }
}

fn describe(position: Option<Position>) -> String {
    match position {
        Some(p) => format_lat_lon(&p),
        None => "No fix".to_string(),
    }
}

impl<W: Write> TrackingDisplay for TerminalDisplay<W> {
    fn render(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        if !self.started {
            execute!(self.out, Hide, DisableLineWrap)?;
            self.started = true;
        }
        if self.last_state.map_or(false, |state| state != snapshot.state) {
            self.notice = None;
        }
        self.last_state = Some(snapshot.state);

        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.render_frame(snapshot)?;
        self.out.flush()?;
        Ok(())
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        self.notice = Some(message.to_string());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.started {
            execute!(self.out, Show, EnableLineWrap)?;
            self.started = false;
        }
        Ok(())
    }
}
