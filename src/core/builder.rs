use std::sync::Arc;

use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::{config::Config, supervisor::Supervisor};
use crate::{
    events::Bus,
    sequence::{Sequence, ServiceRef, StartStopSequence},
    signals::{OsSignals, SignalSource},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    services: Vec<ServiceRef>,
    sequence: Option<Arc<dyn Sequence>>,
    source: Option<Arc<dyn SignalSource>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            services: Vec::new(),
            sequence: None,
            source: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends a service to the default start/stop sequence.
    ///
    /// Services start in insertion order and stop in reverse.
    pub fn with_service(mut self, service: ServiceRef) -> Self {
        self.services.push(service);
        self
    }

    /// Replaces the default sequence; services added with
    /// [`with_service`](Self::with_service) are then ignored.
    pub fn with_sequence(mut self, sequence: Arc<dyn Sequence>) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Replaces the OS signal source (tests use [`ManualSignals`](crate::ManualSignals)).
    pub fn with_signal_source(mut self, source: Arc<dyn SignalSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Builds the supervisor.
    ///
    /// Must be called from within a tokio runtime when subscribers are set.
    pub fn build(self) -> Arc<Supervisor> {
        let Self {
            cfg,
            subscribers,
            services,
            sequence,
            source,
        } = self;

        let bus = Bus::new(cfg.bus_capacity_clamped());
        let fanout = (!subscribers.is_empty())
            .then(|| Fanout::spawn(&bus, SubscriberSet::new(subscribers, bus.clone())));

        let sequence = sequence.unwrap_or_else(|| {
            Arc::new(StartStopSequence::new(services).with_bus(bus.clone()))
        });
        let source = source.unwrap_or_else(|| Arc::new(OsSignals::new()));

        Arc::new(Supervisor::new_internal(cfg, bus, sequence, source, fanout))
    }
}

/// Bus listener forwarding events to a [`SubscriberSet`].
///
/// ```text
/// Bus ──► listener ──► SubscriberSet::emit
///            │
///            └─ token fired ─► forward what is buffered ─► SubscriberSet::shutdown
/// ```
#[derive(Debug)]
pub(crate) struct Fanout {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Fanout {
    /// Subscribes to `bus` and spawns the listener.
    fn spawn(bus: &Bus, subs: SubscriberSet) -> Self {
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        let stop = token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    ev = rx.recv() => match ev {
                        Ok(ev) => subs.emit(ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            subs.shutdown().await;
        });
        Self {
            token,
            task: Some(task),
        }
    }

    /// Stops listening and waits until every subscriber processed its queue.
    pub(crate) async fn close(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Fanout {
    fn drop(&mut self) {
        // The listener still drains on its own.
        self.token.cancel();
    }
}
