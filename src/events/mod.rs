//! # Lifecycle events and the event bus.
//!
//! - [`Event`] / [`EventKind`]: what happened, at which log level.
//! - [`Bus`]: broadcast channel that logs every event it publishes.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
