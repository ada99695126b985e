// src/tracker.rs
//! Foreground event loop that drives a tracking session

use crate::{
    display::TrackingDisplay,
    error::{Result, TrackerError},
    provider::{Command, EventSender, TrackingEvent},
    session::{SessionSummary, TrackingSession, TrackingState},
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use std::{
    io::{self, BufRead},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Owns the session and feeds it every event from one channel
pub struct Tracker<D: TrackingDisplay> {
    session: TrackingSession,
    events: EventSender,
    rx: UnboundedReceiver<TrackingEvent>,
    display: D,
    running: Arc<AtomicBool>,
    refresh: Duration,
    last_summary: Option<SessionSummary>,
}

impl<D: TrackingDisplay> Tracker<D> {
    pub fn new(
        session: TrackingSession,
        events: EventSender,
        rx: UnboundedReceiver<TrackingEvent>,
        display: D,
    ) -> Self {
        Self {
            session,
            events,
            rx,
            display,
            running: Arc::new(AtomicBool::new(true)),
            refresh: Duration::from_secs(1),
            last_summary: None,
        }
    }

    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    /// Sender for user commands
    pub fn commands(&self) -> EventSender {
        self.events.clone()
    }

    /// Flag cleared when the loop exits
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    /// Run until quit or Ctrl+C. An active session is stopped on the way out;
    /// returns the summary of the last stopped session.
    pub async fn run(mut self) -> Result<Option<SessionSummary>> {
        let result = self.run_loop().await;

        self.running.store(false, Ordering::Relaxed);
        match self.session.state() {
            TrackingState::Running | TrackingState::Paused => match self.session.stop() {
                Ok(summary) => self.last_summary = Some(summary),
                Err(e) => log::warn!("{}", e),
            },
            _ => self.session.shutdown(),
        }
        let rendered = self.display.render(&self.session.snapshot());
        let finished = self.display.finish();

        result?;
        rendered?;
        finished?;
        Ok(self.last_summary)
    }

    async fn run_loop(&mut self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.refresh);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    log::info!("Interrupted");
                    break;
                }
                _ = ticker.tick() => {
                    self.display.render(&self.session.snapshot())?;
                }
                event = self.rx.recv() => match event {
                    Some(event) => {
                        if !self.dispatch(event)? {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        Ok(())
    }

    /// Apply one event. Returns false when the loop should end.
    pub fn dispatch(&mut self, event: TrackingEvent) -> Result<bool> {
        let command = match &event {
            TrackingEvent::Command(command) => Some(*command),
            _ => None,
        };

        match self.session.handle_event(event) {
            Ok(Some(summary)) => self.last_summary = Some(summary),
            Ok(None) => {}
            Err(TrackerError::PermissionDenied) => {
                log::warn!("Cannot start tracking: location permission denied");
                self.display.notice("Location permission denied")?;
            }
            Err(e @ TrackerError::InvalidTransition { .. }) => log::debug!("Ignored: {}", e),
            Err(e) if e.is_recoverable() => {
                log::warn!("{}", e);
                self.display.notice(&e.to_string())?;
            }
            Err(e) => return Err(e),
        }

        if let Some(command) = command {
            // refresh straight away so the state change is visible
            self.display.render(&self.session.snapshot())?;
            if command == Command::Quit {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Map a key press to a session command
pub fn command_for_key(key: &KeyEvent) -> Option<Command> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char(c) => command_for_char(c),
        KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

/// Command key table shared by the raw keyboard and line input
pub fn command_for_char(c: char) -> Option<Command> {
    match c.to_ascii_lowercase() {
        's' => Some(Command::Start),
        'p' => Some(Command::Pause),
        'r' => Some(Command::Resume),
        'x' => Some(Command::Stop),
        'q' => Some(Command::Quit),
        _ => None,
    }
}

/// Forward one command per input line until quit or end of input.
///
/// Only the first non-blank character of a line is looked at, so `s` and
/// `start` both start tracking.
pub fn forward_line_commands<R: BufRead>(reader: R, commands: &EventSender) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        let command = match line.trim().chars().next() {
            Some(c) => command_for_char(c),
            None => continue,
        };
        match command {
            Some(command) => {
                if !commands.send_command(command) || command == Command::Quit {
                    break;
                }
            }
            None => log::debug!("Unknown command {:?}", line.trim()),
        }
    }
    Ok(())
}

/// Puts the terminal in raw mode for single-key commands until dropped
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Read key presses on a helper thread and forward them as commands.
///
/// The thread only produces events; the session is still mutated on the
/// foreground loop alone.
pub fn spawn_keyboard(commands: EventSender, running: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    log::warn!("Keyboard input unavailable: {}", e);
                    break;
                }
            }
            let key = match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => key,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("Keyboard input unavailable: {}", e);
                    break;
                }
            };
            if let Some(command) = command_for_key(&key) {
                if !commands.send_command(command) || command == Command::Quit {
                    break;
                }
            }
        }
    })
}

/// Read line commands from stdin on a helper thread, for terminals not in raw mode.
///
/// The thread is left detached: a blocking stdin read cannot be interrupted,
/// and it must not hold up process exit.
pub fn spawn_line_input(commands: EventSender) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        if let Err(e) = forward_line_commands(stdin.lock(), &commands) {
            log::warn!("Command input unavailable: {}", e);
        }
    })
}
