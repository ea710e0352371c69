//! # Signal registration token.
//!
//! [`SignalGuard`] owns one listener task per registered signal. Releasing or
//! dropping the guard stops the listeners and drops their streams, which
//! unregisters them from the [`SignalSource`].

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Signal, SignalSource};

/// Owned registration of signal listeners.
#[must_use = "dropping the guard unregisters the listeners"]
#[derive(Debug)]
pub struct SignalGuard {
    signals: Vec<Signal>,
    token: CancellationToken,
    listeners: Vec<JoinHandle<()>>,
}

impl SignalGuard {
    /// Listens for every signal in `signals`, calling `handler` on each delivery.
    ///
    /// All listeners are opened before any task is spawned; if one fails, the
    /// ones already opened are dropped and the error is returned.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register<H>(
        source: &dyn SignalSource,
        signals: &[Signal],
        handler: H,
    ) -> std::io::Result<Self>
    where
        H: Fn(Signal) + Send + Sync + 'static,
    {
        let streams = signals
            .iter()
            .map(|&signal| source.listen(signal).map(|stream| (signal, stream)))
            .collect::<std::io::Result<Vec<_>>>()?;

        let handler = Arc::new(handler);
        let token = CancellationToken::new();
        let listeners = streams
            .into_iter()
            .map(|(signal, mut stream)| {
                let handler = Arc::clone(&handler);
                let token = token.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            next = stream.next() => match next {
                                Some(()) => handler(signal),
                                None => break,
                            },
                        }
                    }
                })
            })
            .collect();

        Ok(Self {
            signals: signals.to_vec(),
            token,
            listeners,
        })
    }

    /// Signals covered by this registration.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Unregisters all listeners.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.token.cancel();
        for listener in &self.listeners {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::ManualSignals;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn forwards_deliveries_until_released() {
        let source = ManualSignals::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = SignalGuard::register(
            &source,
            &[Signal::Interrupt, Signal::Terminate],
            move |signal| {
                let _ = tx.send(signal);
            },
        )
        .expect("register");
        assert_eq!(source.active(), 2);
        assert_eq!(guard.signals(), &[Signal::Interrupt, Signal::Terminate]);

        source.raise(Signal::Terminate);
        assert_eq!(rx.recv().await, Some(Signal::Terminate));

        guard.release();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.active(), 0);
        assert!(!source.raise(Signal::Interrupt));
    }
}
