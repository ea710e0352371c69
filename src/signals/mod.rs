//! # Termination signals.
//!
//! The supervisor listens for termination signals only while the application
//! is active: the start routine registers listeners through a [`SignalSource`]
//! and keeps the returned [`SignalGuard`]; the stop routine releases it.
//!
//! ```text
//! start routine ──► SignalGuard::register(source, [SIGINT, SIGTERM], handler)
//!                        ├──► listener task ── stream.next() ──► handler(SIGINT)
//!                        └──► listener task ── stream.next() ──► handler(SIGTERM)
//! stop routine  ──► SignalGuard::release()  (listeners aborted, streams dropped)
//! ```
//!
//! Sources:
//! - [`OsSignals`]: process signals via `tokio::signal`.
//! - [`ManualSignals`]: in-process signals raised by code (tests, embedding hosts).

mod guard;
mod manual;
mod os;

use std::fmt;
use std::pin::Pin;

use futures::Stream;

pub use guard::SignalGuard;
pub use manual::ManualSignals;
pub use os::OsSignals;

/// Termination signal understood by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT` (Ctrl-C in a terminal).
    Interrupt,
    /// `SIGTERM` (default kill signal, used by systemd/Kubernetes).
    Terminate,
}

impl Signal {
    /// Conventional signal name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream yielding one item per delivery of a signal.
pub type SignalStream = Pin<Box<dyn Stream<Item = ()> + Send + 'static>>;

/// Source of signal deliveries.
///
/// Each call to [`listen`](SignalSource::listen) creates an independent
/// listener; dropping the stream unregisters it.
pub trait SignalSource: Send + Sync + 'static {
    /// Starts listening for `signal`.
    fn listen(&self, signal: Signal) -> std::io::Result<SignalStream>;
}
