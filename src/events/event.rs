//! # Lifecycle events emitted by the supervisor and the start/stop sequence.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: application start/stop flow (starting, started, stopped, failures)
//! - **Control events**: stop decisions (canceling start, stopping, forcing) and signals
//! - **Service events**: per-service progress inside [`StartStopSequence`](crate::StartStopSequence)
//! - **Subscriber events**: fan-out health (overflow, panics)
//!
//! Every kind carries a log level ([`EventKind::level`]); the [`Bus`](crate::events::Bus)
//! emits each published event through `tracing` at that level.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use appvisor::{Event, EventKind, Signal};
//!
//! let ev = Event::new(EventKind::SignalReceived).with_signal(Signal::Terminate);
//!
//! assert_eq!(ev.kind, EventKind::SignalReceived);
//! assert_eq!(ev.message(), "Received signal SIGTERM");
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use tracing::Level;

use crate::signals::Signal;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Runtime ===
    /// The lifecycle is driven by a current-thread runtime.
    ///
    /// Level: warn.
    SingleThreadRuntime,

    // === Lifecycle ===
    /// The application is starting.
    ///
    /// Sets:
    /// - `app`: application identity
    AppStarting,

    /// The start routine completed successfully.
    AppStarted,

    /// The start routine was canceled.
    StartCanceled,

    /// The start routine failed.
    ///
    /// Sets:
    /// - `reason`: failure message
    StartFailed,

    /// The stop routine completed successfully.
    AppStopped,

    /// The stop routine failed.
    ///
    /// Sets:
    /// - `reason`: failure message
    StopFailed,

    // === Control ===
    /// A termination signal was received.
    ///
    /// Sets:
    /// - `signal`: the signal
    SignalReceived,

    /// `stop()` is canceling a start routine that is still pending or running.
    CancelingStart,

    /// `stop()` is running the stop routine.
    StoppingApp,

    /// `stop()` found shutdown already underway and halted the lifecycle.
    ForcingStop,

    /// Signal listeners were registered by the start routine.
    SignalsRegistered,

    /// Signal listeners were released by the stop routine.
    SignalsUnregistered,

    // === Services ===
    /// A service is starting.
    ///
    /// Sets:
    /// - `task`: service name
    ServiceStarting,

    /// A service started.
    ///
    /// Sets:
    /// - `task`: service name
    ServiceStarted,

    /// A service is stopping.
    ///
    /// Sets:
    /// - `task`: service name
    ServiceStopping,

    /// A service stopped.
    ///
    /// Sets:
    /// - `task`: service name
    ServiceStopped,

    /// A service failed to start or stop.
    ///
    /// Sets:
    /// - `task`: service name
    /// - `reason`: failure message
    ServiceFailed,

    // === Subscribers ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,
}

impl EventKind {
    /// Returns the log level this kind is emitted at.
    pub fn level(&self) -> Level {
        match self {
            EventKind::StartFailed | EventKind::StopFailed | EventKind::ServiceFailed => {
                Level::ERROR
            }
            EventKind::SingleThreadRuntime
            | EventKind::SignalReceived
            | EventKind::ForcingStop
            | EventKind::SubscriberPanicked
            | EventKind::SubscriberOverflow => Level::WARN,
            EventKind::AppStarting
            | EventKind::AppStarted
            | EventKind::StartCanceled
            | EventKind::AppStopped => Level::INFO,
            EventKind::CancelingStart
            | EventKind::StoppingApp
            | EventKind::SignalsRegistered
            | EventKind::SignalsUnregistered
            | EventKind::ServiceStarting
            | EventKind::ServiceStarted
            | EventKind::ServiceStopping
            | EventKind::ServiceStopped => Level::DEBUG,
        }
    }

    /// Returns a short stable label (kebab-case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SingleThreadRuntime => "single-thread-runtime",
            EventKind::AppStarting => "app-starting",
            EventKind::AppStarted => "app-started",
            EventKind::StartCanceled => "start-canceled",
            EventKind::StartFailed => "start-failed",
            EventKind::AppStopped => "app-stopped",
            EventKind::StopFailed => "stop-failed",
            EventKind::SignalReceived => "signal-received",
            EventKind::CancelingStart => "canceling-start",
            EventKind::StoppingApp => "stopping-app",
            EventKind::ForcingStop => "forcing-stop",
            EventKind::SignalsRegistered => "signals-registered",
            EventKind::SignalsUnregistered => "signals-unregistered",
            EventKind::ServiceStarting => "service-starting",
            EventKind::ServiceStarted => "service-started",
            EventKind::ServiceStopping => "service-stopping",
            EventKind::ServiceStopped => "service-stopped",
            EventKind::ServiceFailed => "service-failed",
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Application identity, if applicable.
    pub app: Option<Arc<str>>,
    /// Signal, if applicable.
    pub signal: Option<Signal>,
    /// Service or subscriber name, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            app: None,
            signal: None,
            task: None,
            reason: None,
        }
    }

    /// Attaches the application identity.
    #[inline]
    pub fn with_app(mut self, app: impl Into<Arc<str>>) -> Self {
        self.app = Some(app.into());
        self
    }

    /// Attaches a signal.
    #[inline]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a service or subscriber name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Renders the log line for this event.
    pub fn message(&self) -> String {
        let task = self.task.as_deref().unwrap_or("unknown");
        match self.kind {
            EventKind::SingleThreadRuntime => {
                "Performance can be improved by running on a multi-threaded runtime".to_string()
            }
            EventKind::AppStarting => {
                format!("Starting app {}...", self.app.as_deref().unwrap_or("app"))
            }
            EventKind::AppStarted => "App started".to_string(),
            EventKind::StartCanceled => "App start canceled".to_string(),
            EventKind::StartFailed => "Failed to start app".to_string(),
            EventKind::AppStopped => "App stopped".to_string(),
            EventKind::StopFailed => "Failed to stop app".to_string(),
            EventKind::SignalReceived => match self.signal {
                Some(signal) => format!("Received signal {signal}"),
                None => "Received signal".to_string(),
            },
            EventKind::CancelingStart => "Canceling app start...".to_string(),
            EventKind::StoppingApp => "Stopping app...".to_string(),
            EventKind::ForcingStop => "Forcing app stop...".to_string(),
            EventKind::SignalsRegistered => "Registered signal handlers".to_string(),
            EventKind::SignalsUnregistered => "Unregistered signal handlers".to_string(),
            EventKind::ServiceStarting => format!("Starting service {task}..."),
            EventKind::ServiceStarted => format!("Service {task} started"),
            EventKind::ServiceStopping => format!("Stopping service {task}..."),
            EventKind::ServiceStopped => format!("Service {task} stopped"),
            EventKind::ServiceFailed => format!("Service {task} failed"),
            EventKind::SubscriberPanicked => format!("Subscriber {task} panicked"),
            EventKind::SubscriberOverflow => format!("Subscriber {task} dropped an event"),
        }
    }

    /// Emits the event through `tracing` at the level of its kind.
    pub(crate) fn trace(&self) {
        let message = self.message();
        let kind = self.kind.as_label();
        let reason = self.reason.as_deref();
        match self.kind.level() {
            Level::ERROR => tracing::error!(seq = self.seq, kind, reason, "{message}"),
            Level::WARN => tracing::warn!(seq = self.seq, kind, reason, "{message}"),
            Level::INFO => tracing::info!(seq = self.seq, kind, reason, "{message}"),
            Level::DEBUG => tracing::debug!(seq = self.seq, kind, reason, "{message}"),
            _ => tracing::trace!(seq = self.seq, kind, reason, "{message}"),
        }
    }
}
