//! # Process signals.
//!
//! **Unix platforms:** `SIGINT` and `SIGTERM` via [`tokio::signal::unix`].
//!
//! **Other platforms:** `SIGINT` maps to [`tokio::signal::ctrl_c`];
//! `SIGTERM` never fires.
//!
//! Note that tokio does not restore the default disposition of a signal once a
//! listener was created: after the listeners are released, further deliveries
//! of that signal are ignored by the process.

use super::{Signal, SignalSource, SignalStream};

/// [`SignalSource`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignals;

impl OsSignals {
    /// Creates the source.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl SignalSource for OsSignals {
    fn listen(&self, signal: Signal) -> std::io::Result<SignalStream> {
        use tokio::signal::unix::{SignalKind, signal as unix_signal};

        let kind = match signal {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
        };
        let listener = unix_signal(kind)?;

        Ok(Box::pin(futures::stream::unfold(
            listener,
            |mut listener| async move { listener.recv().await.map(|()| ((), listener)) },
        )))
    }
}

#[cfg(not(unix))]
impl SignalSource for OsSignals {
    fn listen(&self, signal: Signal) -> std::io::Result<SignalStream> {
        match signal {
            Signal::Interrupt => Ok(Box::pin(futures::stream::unfold((), |()| async {
                tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
            }))),
            Signal::Terminate => Ok(Box::pin(futures::stream::pending())),
        }
    }
}
