//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (supervisor, routines,
//! start/stop sequence, subscriber workers).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                      Receivers:
//!   Supervisor        ──┐
//!   StartStopSequence ──┼──► Bus ──┬──► tracing (synchronously, at EventKind::level)
//!   SubscriberSet     ──┘          ├──► subscriber listener ──► SubscriberSet
//!                                  └──► Supervisor::subscribe() receivers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Logged on publish**: the event is written through `tracing` before it is broadcast,
//!   so the log trail is complete even when the lifecycle is halted abruptly.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to a minimum of 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Logs the event and publishes it to all active receivers.
    ///
    /// If there are no receivers, the event is only logged.
    pub fn publish(&self, ev: Event) {
        ev.trace();
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// A receiver only gets events **sent after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn receivers_see_events_published_after_subscribing() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::AppStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::AppStarted));

        let ev = rx.try_recv().expect("event");
        assert_eq!(ev.kind, EventKind::AppStarted);
        assert!(rx.try_recv().is_err());
    }
}
