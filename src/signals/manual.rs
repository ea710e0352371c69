//! # Signals raised from code.
//!
//! [`ManualSignals`] delivers signals through a broadcast channel instead of
//! the operating system, so a lifecycle can be driven deterministically in
//! tests or by a host that receives shutdown requests another way.
//!
//! ## Example
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use futures::StreamExt;
//! use appvisor::{ManualSignals, Signal, SignalSource};
//!
//! let signals = ManualSignals::new();
//! let mut sigterm = signals.listen(Signal::Terminate).unwrap();
//! assert_eq!(signals.active(), 1);
//!
//! signals.raise(Signal::Terminate);
//! assert_eq!(sigterm.next().await, Some(()));
//!
//! drop(sigterm);
//! assert_eq!(signals.active(), 0);
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast::{self, error::RecvError};

use super::{Signal, SignalSource, SignalStream};

/// Decrements the live-listener count when the stream is dropped.
struct Registration {
    active: Arc<AtomicUsize>,
}

impl Registration {
    fn new(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-process [`SignalSource`].
#[derive(Debug, Clone)]
pub struct ManualSignals {
    tx: broadcast::Sender<Signal>,
    active: Arc<AtomicUsize>,
}

impl ManualSignals {
    /// Creates a source with no listeners.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self {
            tx,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delivers `signal` to every current listener of that signal.
    ///
    /// Returns `false` when nobody listens at all.
    pub fn raise(&self, signal: Signal) -> bool {
        self.tx.send(signal).is_ok()
    }

    /// Number of live listeners (streams not yet dropped).
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for ManualSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for ManualSignals {
    fn listen(&self, signal: Signal) -> std::io::Result<SignalStream> {
        let state = (self.tx.subscribe(), Registration::new(&self.active));

        Ok(Box::pin(futures::stream::unfold(
            state,
            move |(mut rx, registration)| async move {
                loop {
                    match rx.recv().await {
                        Ok(raised) if raised == signal => return Some(((), (rx, registration))),
                        Ok(_) | Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => return None,
                    }
                }
            },
        )))
    }
}
