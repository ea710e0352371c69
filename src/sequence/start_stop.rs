//! # Ordered start/stop of services.
//!
//! ```text
//! start(ctx):  svc[0].start ─► svc[1].start ─► ... ─► svc[N-1].start
//!              (ctx checked before each service; first error aborts the walk)
//!
//! stop():      svc[k-1].stop ─► ... ─► svc[0].stop      (k = services started)
//!              (continues past failures; first error is returned)
//! ```
//!
//! ## Rules
//! - Only services whose `start` returned `Ok` are stopped.
//! - A failed or canceled start leaves the already started prefix in place,
//!   so the following `stop()` tears exactly that prefix down.
//! - A second `start()` after a partial start resumes from the first service
//!   that is not running yet.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Sequence, ServiceRef};
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};

/// [`Sequence`] over an ordered list of services.
pub struct StartStopSequence {
    services: Vec<ServiceRef>,
    started: AtomicUsize,
    bus: Option<Bus>,
}

impl StartStopSequence {
    /// Creates a sequence; services start in the given order.
    pub fn new(services: Vec<ServiceRef>) -> Self {
        Self {
            services,
            started: AtomicUsize::new(0),
            bus: None,
        }
    }

    /// Publishes per-service events on `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` when no service is registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Number of services currently started.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn publish(&self, kind: EventKind, service: &ServiceRef, err: Option<&TaskError>) {
        if let Some(bus) = &self.bus {
            let mut ev = Event::new(kind).with_task(service.name());
            if let Some(err) = err {
                ev = ev.with_reason(err.to_string());
            }
            bus.publish(ev);
        }
    }
}

#[async_trait]
impl Sequence for StartStopSequence {
    async fn start(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        for service in self.services.iter().skip(self.started()) {
            if ctx.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            self.publish(EventKind::ServiceStarting, service, None);
            if let Err(err) = service.start(ctx.clone()).await {
                if !err.is_canceled() {
                    self.publish(EventKind::ServiceFailed, service, Some(&err));
                }
                return Err(err);
            }
            self.started.fetch_add(1, Ordering::SeqCst);
            self.publish(EventKind::ServiceStarted, service, None);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), TaskError> {
        let started = self.started.swap(0, Ordering::SeqCst);
        let mut first_err = None;

        for service in self.services[..started].iter().rev() {
            self.publish(EventKind::ServiceStopping, service, None);
            match service.stop().await {
                Ok(()) => self.publish(EventKind::ServiceStopped, service, None),
                Err(err) => {
                    self.publish(EventKind::ServiceFailed, service, Some(&err));
                    first_err.get_or_insert(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
