// src/provider.rs
//! Interfaces to the location and motion sources a session consumes.
//!
//! Every push source reports through an [`EventSink`] into a single channel.
//! The foreground loop drains that channel and hands each [`TrackingEvent`]
//! to the session, so provider I/O never touches session state directly.

use crate::{error::Result, gps::Position, sensor::AccelerometerReading};
use async_trait::async_trait;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};
use tokio::{sync::mpsc, task::JoinHandle};

pub type SubscriptionId = u64;

/// Outcome of a foreground permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Balanced,
    High,
    Highest,
}

/// Expected motion pattern, lets a provider tune its sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityHint {
    Other,
    Fitness,
    Navigation,
}

/// Options for a position watch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    pub interval_ms: u64,
    pub min_distance_m: f64,
    pub activity: ActivityHint,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::Highest,
            interval_ms: 1000,
            min_distance_m: 0.0,
            activity: ActivityHint::Fitness,
        }
    }
}

/// User commands that travel on the same channel as provider updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::Quit => "quit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum TrackingEvent {
    Position {
        subscription: SubscriptionId,
        position: Position,
    },
    Acceleration {
        subscription: SubscriptionId,
        reading: AccelerometerReading,
    },
    /// A provider stream failed or ended on its own
    ProviderError {
        subscription: SubscriptionId,
        message: String,
    },
    Command(Command),
}

/// Hands out sinks for the foreground event channel
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<TrackingEvent>,
    next_id: Arc<AtomicU64>,
}

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TrackingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (sender, rx)
    }

    /// Create a sink with a fresh subscription id
    pub fn sink(&self) -> EventSink {
        EventSink {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            tx: self.tx.clone(),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn send_command(&self, command: Command) -> bool {
        self.tx.send(TrackingEvent::Command(command)).is_ok()
    }
}

/// Callback end of one subscription
#[derive(Clone)]
pub struct EventSink {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<TrackingEvent>,
    active: Arc<AtomicBool>,
}

impl EventSink {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// False once the subscription was cancelled or the loop went away
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    pub fn send_position(&self, position: Position) -> bool {
        self.send(TrackingEvent::Position {
            subscription: self.id,
            position,
        })
    }

    pub fn send_acceleration(&self, reading: AccelerometerReading) -> bool {
        self.send(TrackingEvent::Acceleration {
            subscription: self.id,
            reading,
        })
    }

    pub fn send_error(&self, message: impl Into<String>) -> bool {
        self.send(TrackingEvent::ProviderError {
            subscription: self.id,
            message: message.into(),
        })
    }

    fn send(&self, event: TrackingEvent) -> bool {
        if !self.is_active() {
            return false;
        }
        self.tx.send(event).is_ok()
    }
}

/// Handle to an active provider stream. Cancelled on drop.
pub struct Subscription {
    id: SubscriptionId,
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(sink: &EventSink, task: Option<JoinHandle<()>>) -> Self {
        Self {
            id: sink.id,
            active: Arc::clone(&sink.active),
            task,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop delivery. Once this returns the sink refuses further sends.
    pub fn cancel(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Source of position fixes
#[async_trait]
pub trait LocationProvider: Send {
    fn name(&self) -> &str;

    async fn request_permission(&mut self) -> Result<PermissionStatus>;

    async fn current_position(&mut self) -> Result<Position>;

    /// Begin delivering fixes into `sink`. Must be called inside a tokio runtime
    /// by providers that spawn a reader task.
    fn watch_position(&mut self, options: WatchOptions, sink: EventSink) -> Result<Subscription>;
}

/// Source of three-axis acceleration readings
pub trait AccelerometerStream: Send {
    fn set_update_interval(&mut self, interval_ms: u64);

    fn subscribe(&mut self, sink: EventSink) -> Result<Subscription>;
}

/// Applies the interval and minimum-distance parts of [`WatchOptions`]
#[derive(Debug, Clone)]
pub struct CadenceFilter {
    interval_ms: i64,
    min_distance_m: f64,
    last: Option<Position>,
}

impl CadenceFilter {
    pub fn new(options: &WatchOptions) -> Self {
        Self {
            interval_ms: options.interval_ms as i64,
            min_distance_m: options.min_distance_m,
            last: None,
        }
    }

    pub fn accept(&mut self, position: &Position) -> bool {
        if let Some(last) = &self.last {
            let elapsed = position.timestamp_ms - last.timestamp_ms;
            // a clock that jumped backwards restarts the cadence
            if elapsed >= 0 && elapsed < self.interval_ms {
                return false;
            }
            if self.min_distance_m > 0.0 && last.distance_to(position) < self.min_distance_m {
                return false;
            }
        }
        self.last = Some(*position);
        true
    }
}
