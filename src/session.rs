// src/session.rs
//! Tracking session state machine
//!
//! The session turns position fixes into distance and speed and accelerometer
//! readings into a step count. All mutation happens through its synchronous
//! methods; providers only reach it via [`TrackingSession::handle_event`].

use crate::{
    config::TrackerConfig,
    error::{Result, TrackerError},
    gps::Position,
    provider::{
        AccelerometerStream, Command, EventSender, LocationProvider, PermissionStatus,
        Subscription, TrackingEvent, WatchOptions,
    },
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Default accelerometer magnitude (in g) above which a step is counted
pub const DEFAULT_STEP_THRESHOLD: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackingState {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackingState::Idle => "idle",
            TrackingState::Running => "running",
            TrackingState::Paused => "paused",
            TrackingState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SessionMetrics {
    pub total_distance_m: f64,
    /// m/s
    pub current_speed: f64,
    pub step_count: u64,
}

impl SessionMetrics {
    pub fn speed_kmh(&self) -> f64 {
        self.current_speed * 3.6
    }

    pub fn distance_km(&self) -> f64 {
        self.total_distance_m / 1000.0
    }
}

/// What the map surface needs to draw the marker and place the camera
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: TrackingState,
    pub metrics: SessionMetrics,
    pub initial_position: Option<Position>,
    pub current_position: Option<Position>,
}

impl SessionSnapshot {
    /// Latest known position, falling back to where the session began
    pub fn camera_center(&self) -> Option<Position> {
        self.current_position.or(self.initial_position)
    }
}

/// Metrics captured right before a stop resets them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub metrics: SessionMetrics,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn duration(&self) -> chrono::Duration {
        self.started_at
            .map(|start| self.ended_at.signed_duration_since(start))
            .unwrap_or_else(chrono::Duration::zero)
    }

    pub fn format_duration(&self) -> String {
        let total_seconds = self.duration().num_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

pub struct TrackingSession {
    provider: Box<dyn LocationProvider>,
    accelerometer: Option<Box<dyn AccelerometerStream>>,
    events: EventSender,
    permission: PermissionStatus,
    watch_options: WatchOptions,
    step_threshold: f64,
    accel_interval_ms: u64,

    state: TrackingState,
    metrics: SessionMetrics,
    reference: Option<Position>,
    initial_position: Option<Position>,
    current_position: Option<Position>,
    started_at: Option<DateTime<Utc>>,

    location_subscription: Option<Subscription>,
    accel_subscription: Option<Subscription>,
}

impl TrackingSession {
    /// Build a session from an already known permission result
    pub fn new(
        provider: Box<dyn LocationProvider>,
        accelerometer: Option<Box<dyn AccelerometerStream>>,
        events: EventSender,
        permission: PermissionStatus,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            provider,
            accelerometer,
            events,
            permission,
            watch_options: config.watch_options(),
            step_threshold: config.step_threshold,
            accel_interval_ms: config.accel_interval_ms,
            state: TrackingState::Idle,
            metrics: SessionMetrics::default(),
            reference: None,
            initial_position: None,
            current_position: None,
            started_at: None,
            location_subscription: None,
            accel_subscription: None,
        }
    }

    /// Request permission once, fetch the starting position, and return an idle session
    pub async fn activate(
        mut provider: Box<dyn LocationProvider>,
        accelerometer: Option<Box<dyn AccelerometerStream>>,
        events: EventSender,
        config: &TrackerConfig,
    ) -> Result<Self> {
        let permission = provider.request_permission().await?;
        let mut initial_position = None;

        if permission.is_granted() {
            match provider.current_position().await {
                Ok(position) => initial_position = Some(position),
                Err(e) => log::warn!("Could not get current position from {}: {}", provider.name(), e),
            }
        } else {
            log::warn!("Location permission denied by {}", provider.name());
        }

        let mut session = Self::new(provider, accelerometer, events, permission, config);
        session.initial_position = initial_position;
        session.current_position = initial_position;
        Ok(session)
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn metrics(&self) -> SessionMetrics {
        self.metrics
    }

    pub fn permission(&self) -> PermissionStatus {
        self.permission
    }

    pub fn initial_position(&self) -> Option<Position> {
        self.initial_position
    }

    pub fn camera_center(&self) -> Option<Position> {
        self.current_position.or(self.initial_position)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            metrics: self.metrics,
            initial_position: self.initial_position,
            current_position: self.current_position,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        match self.state {
            TrackingState::Idle | TrackingState::Stopped => {}
            state => return Err(TrackerError::InvalidTransition { state, command: "start" }),
        }
        if !self.permission.is_granted() {
            return Err(TrackerError::PermissionDenied);
        }

        self.subscribe()?;
        self.started_at = Some(Utc::now());
        self.state = TrackingState::Running;
        log::info!("Tracking started via {}", self.provider.name());
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != TrackingState::Running {
            return Err(TrackerError::InvalidTransition {
                state: self.state,
                command: "pause",
            });
        }

        self.release_subscriptions();
        self.metrics.current_speed = 0.0;
        // movement while paused must not be counted on resume
        self.reference = None;
        self.state = TrackingState::Paused;
        log::info!(
            "Tracking paused at {:.1} m, {} steps",
            self.metrics.total_distance_m,
            self.metrics.step_count
        );
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.state != TrackingState::Paused {
            return Err(TrackerError::InvalidTransition {
                state: self.state,
                command: "resume",
            });
        }

        self.subscribe()?;
        self.state = TrackingState::Running;
        log::info!("Tracking resumed");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<SessionSummary> {
        match self.state {
            TrackingState::Running | TrackingState::Paused => {}
            state => return Err(TrackerError::InvalidTransition { state, command: "stop" }),
        }

        self.release_subscriptions();
        let summary = SessionSummary {
            metrics: self.metrics,
            started_at: self.started_at.take(),
            ended_at: Utc::now(),
        };

        self.metrics = SessionMetrics::default();
        self.reference = None;
        self.state = TrackingState::Stopped;
        log::info!(
            "Tracking stopped: {:.1} m, {} steps in {}",
            summary.metrics.total_distance_m,
            summary.metrics.step_count,
            summary.format_duration()
        );
        Ok(summary)
    }

    /// Release provider streams on screen exit, leaving state and metrics as they are
    pub fn shutdown(&mut self) {
        self.release_subscriptions();
    }

    pub fn on_position_update(&mut self, position: Position) {
        if self.state != TrackingState::Running {
            log::trace!("Ignoring position update while {}", self.state);
            return;
        }

        self.metrics.current_speed = position.sanitized_speed();
        if let Some(reference) = &self.reference {
            self.metrics.total_distance_m += reference.distance_to(&position);
        }
        self.reference = Some(position);
        self.current_position = Some(position);
    }

    /// Count a step when the magnitude crosses the threshold.
    ///
    /// There is no debounce window, so a reading that oscillates above the
    /// threshold counts once per sample.
    pub fn on_accelerometer_sample(&mut self, magnitude: f64) {
        if self.state != TrackingState::Running {
            return;
        }
        if magnitude > self.step_threshold {
            self.metrics.step_count += 1;
        }
    }

    /// Apply one event from the foreground channel.
    ///
    /// Provider events from a subscription that is no longer current are
    /// dropped. Commands are applied and their result returned.
    pub fn handle_event(&mut self, event: TrackingEvent) -> Result<Option<SessionSummary>> {
        match event {
            TrackingEvent::Position { subscription, position } => {
                if self.is_current(&self.location_subscription, subscription) {
                    self.on_position_update(position);
                } else {
                    log::debug!("Dropping position from stale subscription {}", subscription);
                }
                Ok(None)
            }
            TrackingEvent::Acceleration { subscription, reading } => {
                if self.is_current(&self.accel_subscription, subscription) {
                    self.on_accelerometer_sample(reading.magnitude());
                }
                Ok(None)
            }
            TrackingEvent::ProviderError { subscription, message } => {
                if self.is_current(&self.location_subscription, subscription)
                    || self.is_current(&self.accel_subscription, subscription)
                {
                    log::warn!("Provider stream {} failed: {}", subscription, message);
                    return Err(TrackerError::ProviderUnavailable(message));
                }
                Ok(None)
            }
            TrackingEvent::Command(command) => self.apply(command),
        }
    }

    pub fn apply(&mut self, command: Command) -> Result<Option<SessionSummary>> {
        match command {
            Command::Start => self.start().map(|_| None),
            Command::Pause => self.pause().map(|_| None),
            Command::Resume => self.resume().map(|_| None),
            Command::Stop => self.stop().map(Some),
            Command::Quit => {
                self.shutdown();
                Ok(None)
            }
        }
    }

    fn is_current(&self, slot: &Option<Subscription>, id: u64) -> bool {
        slot.as_ref().map_or(false, |s| s.id() == id && s.is_active())
    }

    fn subscribe(&mut self) -> Result<()> {
        self.release_subscriptions();

        let sink = self.events.sink();
        let subscription = self
            .provider
            .watch_position(self.watch_options, sink)
            .map_err(|e| {
                log::warn!("Failed to watch position on {}: {}", self.provider.name(), e);
                match e {
                    TrackerError::PermissionDenied => TrackerError::PermissionDenied,
                    TrackerError::ProviderUnavailable(msg) => TrackerError::ProviderUnavailable(msg),
                    other => TrackerError::ProviderUnavailable(other.to_string()),
                }
            })?;
        self.location_subscription = Some(subscription);

        if let Some(accelerometer) = self.accelerometer.as_mut() {
            accelerometer.set_update_interval(self.accel_interval_ms);
            match accelerometer.subscribe(self.events.sink()) {
                Ok(subscription) => self.accel_subscription = Some(subscription),
                Err(e) => log::warn!("Accelerometer unavailable, steps will not be counted: {}", e),
            }
        }

        Ok(())
    }

    fn release_subscriptions(&mut self) {
        if let Some(mut subscription) = self.location_subscription.take() {
            subscription.cancel();
        }
        if let Some(mut subscription) = self.accel_subscription.take() {
            subscription.cancel();
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.release_subscriptions();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geo::haversine_distance, provider::EventSink, sensor::AccelerometerReading};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records every sink handed to it so tests can push fixes by hand
    #[derive(Default)]
    struct ScriptedProvider {
        sinks: Arc<Mutex<Vec<EventSink>>>,
        options: Arc<Mutex<Vec<WatchOptions>>>,
        fail_watch: bool,
    }

    #[async_trait]
    impl LocationProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn request_permission(&mut self) -> Result<PermissionStatus> {
            Ok(PermissionStatus::Granted)
        }

        async fn current_position(&mut self) -> Result<Position> {
            Ok(Position::new(-23.55, -46.63, 0, 0.0))
        }

        fn watch_position(&mut self, options: WatchOptions, sink: EventSink) -> Result<Subscription> {
            if self.fail_watch {
                return Err(TrackerError::Connection("gpsd refused".to_string()));
            }
            let subscription = Subscription::new(&sink, None);
            self.options.lock().unwrap().push(options);
            self.sinks.lock().unwrap().push(sink);
            Ok(subscription)
        }
    }

    struct ScriptedAccelerometer {
        interval: Arc<Mutex<u64>>,
    }

    impl AccelerometerStream for ScriptedAccelerometer {
        fn set_update_interval(&mut self, interval_ms: u64) {
            *self.interval.lock().unwrap() = interval_ms;
        }

        fn subscribe(&mut self, sink: EventSink) -> Result<Subscription> {
            Ok(Subscription::new(&sink, None))
        }
    }

    fn session_with(permission: PermissionStatus) -> TrackingSession {
        let (events, _rx) = EventSender::channel();
        TrackingSession::new(
            Box::new(ScriptedProvider::default()),
            None,
            events,
            permission,
            &TrackerConfig::default(),
        )
    }

    fn running_session() -> TrackingSession {
        let mut session = session_with(PermissionStatus::Granted);
        session.start().unwrap();
        session
    }

    const A: (f64, f64) = (-23.5505, -46.6333);
    const B: (f64, f64) = (-23.5510, -46.6340);
    const C: (f64, f64) = (-23.5520, -46.6352);

    fn fix(point: (f64, f64), t: i64, speed: f64) -> Position {
        Position::new(point.0, point.1, t, speed)
    }

    #[test]
    fn test_start_from_idle() {
        let session = running_session();
        assert_eq!(session.state(), TrackingState::Running);
        assert_eq!(session.metrics(), SessionMetrics::default());
    }

    #[test]
    fn test_start_requests_fitness_watch() {
        let provider = ScriptedProvider::default();
        let options = Arc::clone(&provider.options);
        let (events, _rx) = EventSender::channel();
        let mut session = TrackingSession::new(
            Box::new(provider),
            None,
            events,
            PermissionStatus::Granted,
            &TrackerConfig::default(),
        );
        session.start().unwrap();
        assert_eq!(options.lock().unwrap()[0], WatchOptions::default());
    }

    #[test]
    fn test_start_without_permission() {
        let mut session = session_with(PermissionStatus::Denied);
        assert!(matches!(session.start(), Err(TrackerError::PermissionDenied)));
        assert_eq!(session.state(), TrackingState::Idle);
    }

    #[test]
    fn test_provider_failure_keeps_state() {
        let (events, _rx) = EventSender::channel();
        let provider = ScriptedProvider {
            fail_watch: true,
            ..ScriptedProvider::default()
        };
        let mut session = TrackingSession::new(
            Box::new(provider),
            None,
            events,
            PermissionStatus::Granted,
            &TrackerConfig::default(),
        );
        assert!(matches!(session.start(), Err(TrackerError::ProviderUnavailable(_))));
        assert_eq!(session.state(), TrackingState::Idle);
        assert_eq!(session.metrics(), SessionMetrics::default());
    }

    #[test]
    fn test_additive_distance() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 1.0));
        session.on_position_update(fix(B, 1000, 1.5));
        session.on_position_update(fix(C, 2000, 2.0));

        let expected = haversine_distance(A.0, A.1, B.0, B.1) + haversine_distance(B.0, B.1, C.0, C.1);
        assert!((session.metrics().total_distance_m - expected).abs() < 1e-9);
        assert_eq!(session.metrics().current_speed, 2.0);
    }

    #[test]
    fn test_first_fix_adds_no_distance() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 0.0));
        assert_eq!(session.metrics().total_distance_m, 0.0);
        assert_eq!(session.camera_center(), Some(fix(A, 0, 0.0)));
    }

    #[test]
    fn test_missing_speed_falls_back_to_zero() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, f64::NAN));
        assert_eq!(session.metrics().current_speed, 0.0);
    }

    #[test]
    fn test_pause_resume_keeps_metrics() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 1.0));
        session.on_position_update(fix(B, 1000, 1.0));
        session.on_accelerometer_sample(1.5);
        let before = session.metrics();

        session.pause().unwrap();
        assert_eq!(session.state(), TrackingState::Paused);
        assert_eq!(session.metrics().current_speed, 0.0);

        session.resume().unwrap();
        assert_eq!(session.state(), TrackingState::Running);
        assert_eq!(session.metrics().total_distance_m, before.total_distance_m);
        assert_eq!(session.metrics().step_count, before.step_count);
    }

    #[test]
    fn test_paused_ignores_updates() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 1.0));
        session.on_position_update(fix(B, 1000, 1.0));
        let frozen = session.metrics().total_distance_m;

        session.pause().unwrap();
        session.on_position_update(fix(C, 2000, 3.0));
        session.on_accelerometer_sample(2.0);
        assert_eq!(session.metrics().total_distance_m, frozen);
        assert_eq!(session.metrics().step_count, 0);
        assert_eq!(session.metrics().current_speed, 0.0);
    }

    #[test]
    fn test_resume_does_not_count_paused_movement() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 1.0));
        session.pause().unwrap();
        session.resume().unwrap();
        session.on_position_update(fix(C, 5000, 1.0));
        assert_eq!(session.metrics().total_distance_m, 0.0);
    }

    #[test]
    fn test_stop_resets_from_running() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 1.0));
        session.on_position_update(fix(B, 1000, 2.0));
        session.on_accelerometer_sample(1.5);

        let summary = session.stop().unwrap();
        assert!(summary.metrics.total_distance_m > 0.0);
        assert_eq!(summary.metrics.step_count, 1);
        assert_eq!(session.state(), TrackingState::Stopped);
        assert_eq!(session.metrics().total_distance_m, 0.0);
        assert_eq!(session.metrics().step_count, 0);
        assert_eq!(session.metrics().current_speed, 0.0);
    }

    #[test]
    fn test_stop_resets_from_paused() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 1.0));
        session.on_position_update(fix(B, 1000, 2.0));
        session.pause().unwrap();

        session.stop().unwrap();
        assert_eq!(session.metrics(), SessionMetrics::default());
    }

    #[test]
    fn test_restart_after_stop() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 1.0));
        session.stop().unwrap();
        session.start().unwrap();
        // reference was cleared by stop
        session.on_position_update(fix(C, 1000, 1.0));
        assert_eq!(session.state(), TrackingState::Running);
        assert_eq!(session.metrics().total_distance_m, 0.0);
    }

    #[test]
    fn test_step_threshold() {
        let mut session = running_session();
        session.on_accelerometer_sample(1.5);
        assert_eq!(session.metrics().step_count, 1);
        session.on_accelerometer_sample(1.0);
        assert_eq!(session.metrics().step_count, 1);
        session.on_accelerometer_sample(DEFAULT_STEP_THRESHOLD);
        assert_eq!(session.metrics().step_count, 1);
    }

    #[test]
    fn test_pause_while_idle_is_rejected() {
        let mut session = session_with(PermissionStatus::Granted);
        let result = session.pause();
        assert!(matches!(
            result,
            Err(TrackerError::InvalidTransition { state: TrackingState::Idle, .. })
        ));
        assert_eq!(session.state(), TrackingState::Idle);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut session = session_with(PermissionStatus::Granted);
        assert!(session.stop().is_err());
        assert!(session.resume().is_err());
        assert_eq!(session.state(), TrackingState::Idle);

        session.start().unwrap();
        assert!(session.start().is_err());
        assert!(session.resume().is_err());
        assert_eq!(session.state(), TrackingState::Running);

        session.stop().unwrap();
        assert!(session.pause().is_err());
        assert!(session.stop().is_err());
        assert_eq!(session.state(), TrackingState::Stopped);
    }

    #[test]
    fn test_resubscribe_cancels_previous_stream() {
        let provider = ScriptedProvider::default();
        let sinks = Arc::clone(&provider.sinks);
        let (events, _rx) = EventSender::channel();
        let mut session = TrackingSession::new(
            Box::new(provider),
            None,
            events,
            PermissionStatus::Granted,
            &TrackerConfig::default(),
        );

        session.start().unwrap();
        session.pause().unwrap();
        session.resume().unwrap();

        let sinks = sinks.lock().unwrap();
        assert_eq!(sinks.len(), 2);
        assert!(!sinks[0].is_active());
        assert!(sinks[1].is_active());
    }

    #[test]
    fn test_stale_events_are_dropped() {
        let provider = ScriptedProvider::default();
        let sinks = Arc::clone(&provider.sinks);
        let (events, _rx) = EventSender::channel();
        let mut session = TrackingSession::new(
            Box::new(provider),
            None,
            events,
            PermissionStatus::Granted,
            &TrackerConfig::default(),
        );

        session.start().unwrap();
        let old_id = sinks.lock().unwrap()[0].id();
        session.pause().unwrap();
        session.resume().unwrap();
        let new_id = sinks.lock().unwrap()[1].id();

        session
            .handle_event(TrackingEvent::Position { subscription: old_id, position: fix(A, 0, 4.0) })
            .unwrap();
        assert_eq!(session.metrics().current_speed, 0.0);

        session
            .handle_event(TrackingEvent::Position { subscription: new_id, position: fix(A, 0, 4.0) })
            .unwrap();
        assert_eq!(session.metrics().current_speed, 4.0);
    }

    #[test]
    fn test_stream_failure_keeps_state_and_metrics() {
        let mut session = running_session();
        session.on_position_update(fix(A, 0, 1.0));
        session.on_position_update(fix(B, 1000, 1.5));
        session.on_accelerometer_sample(1.5);
        let before = session.metrics();

        let id = session.location_subscription.as_ref().unwrap().id();
        let result = session.handle_event(TrackingEvent::ProviderError {
            subscription: id,
            message: "gpsd closed the connection".to_string(),
        });
        assert!(matches!(result, Err(TrackerError::ProviderUnavailable(ref m)) if m == "gpsd closed the connection"));
        assert_eq!(session.state(), TrackingState::Running);
        assert_eq!(session.metrics(), before);
    }

    #[test]
    fn test_stale_stream_failure_is_ignored() {
        let provider = ScriptedProvider::default();
        let sinks = Arc::clone(&provider.sinks);
        let (events, _rx) = EventSender::channel();
        let mut session = TrackingSession::new(
            Box::new(provider),
            None,
            events,
            PermissionStatus::Granted,
            &TrackerConfig::default(),
        );

        session.start().unwrap();
        let old_id = sinks.lock().unwrap()[0].id();
        session.pause().unwrap();
        session.resume().unwrap();

        let result = session.handle_event(TrackingEvent::ProviderError {
            subscription: old_id,
            message: "replay finished".to_string(),
        });
        assert!(matches!(result, Ok(None)));
        assert_eq!(session.state(), TrackingState::Running);
    }

    #[test]
    fn test_quit_releases_streams_keeps_metrics() {
        let provider = ScriptedProvider::default();
        let sinks = Arc::clone(&provider.sinks);
        let (events, _rx) = EventSender::channel();
        let mut session = TrackingSession::new(
            Box::new(provider),
            None,
            events,
            PermissionStatus::Granted,
            &TrackerConfig::default(),
        );

        session.start().unwrap();
        session.on_position_update(fix(A, 0, 1.0));
        session.on_position_update(fix(B, 1000, 2.0));
        let before = session.metrics();

        assert!(matches!(session.apply(Command::Quit), Ok(None)));
        assert!(!sinks.lock().unwrap()[0].is_active());
        assert!(session.location_subscription.is_none());
        assert_eq!(session.metrics(), before);
        assert_eq!(session.state(), TrackingState::Running);

        // nothing from the released stream lands afterwards
        let id = sinks.lock().unwrap()[0].id();
        session
            .handle_event(TrackingEvent::Position { subscription: id, position: fix(C, 2000, 3.0) })
            .unwrap();
        assert_eq!(session.metrics(), before);
    }

    #[test]
    fn test_accelerometer_events_count_steps() {
        let interval = Arc::new(Mutex::new(0));
        let accel = ScriptedAccelerometer { interval: Arc::clone(&interval) };
        let (events, _rx) = EventSender::channel();
        let mut session = TrackingSession::new(
            Box::new(ScriptedProvider::default()),
            Some(Box::new(accel)),
            events,
            PermissionStatus::Granted,
            &TrackerConfig::default(),
        );
        session.start().unwrap();
        assert_eq!(*interval.lock().unwrap(), 1000);

        let id = session.accel_subscription.as_ref().unwrap().id();
        let shake = AccelerometerReading::new(1.0, 1.0, 0.0);
        session
            .handle_event(TrackingEvent::Acceleration { subscription: id, reading: shake })
            .unwrap();
        assert_eq!(session.metrics().step_count, 1);
    }

    #[test]
    fn test_commands_through_events() {
        let mut session = session_with(PermissionStatus::Granted);
        session.handle_event(TrackingEvent::Command(Command::Start)).unwrap();
        session.on_position_update(fix(A, 0, 1.0));
        session.on_position_update(fix(B, 1000, 1.0));
        let summary = session
            .handle_event(TrackingEvent::Command(Command::Stop))
            .unwrap()
            .expect("stop yields a summary");
        assert!(summary.metrics.total_distance_m > 0.0);
        assert_eq!(session.state(), TrackingState::Stopped);
    }

    #[tokio::test]
    async fn test_activate_records_initial_position() {
        let (events, _rx) = EventSender::channel();
        let session = TrackingSession::activate(
            Box::new(ScriptedProvider::default()),
            None,
            events,
            &TrackerConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(session.state(), TrackingState::Idle);
        assert_eq!(session.permission(), PermissionStatus::Granted);
        let initial = session.initial_position().unwrap();
        assert_eq!(session.snapshot().camera_center(), Some(initial));
    }

    #[test]
    fn test_summary_duration_format() {
        let ended_at = Utc::now();
        let summary = SessionSummary {
            metrics: SessionMetrics::default(),
            started_at: Some(ended_at - chrono::Duration::seconds(3725)),
            ended_at,
        };
        assert_eq!(summary.format_duration(), "1h 2m 5s");
    }
}
