//! # Supervisor: drives one application through start, run and stop.
//!
//! The [`Supervisor`] owns two [`TaskHandle`]s, one wrapping the start routine
//! and one wrapping the stop routine, and decides what a stop request means
//! given their current statuses.
//!
//! ## High-level architecture
//! ```text
//! run() ──► spawn body (next tick) ──► RunHandle
//!
//! body:
//!   create start/stop handles ─► publish AppStarting ─► apply deferred stop()
//!   start.run(); start.wait()
//!       ├─ Ok        ─► AppStarted
//!       ├─ Canceled  ─► StartCanceled ─► stop()
//!       └─ Err(e)    ─► StartFailed   ─► stop()
//!   stop.wait()
//!       ├─ Ok        ─► AppStopped                      (RunHandle → Exit::Graceful)
//!       └─ Err(e)    ─► StopFailed    ─► stop() ─► forced (RunHandle → Exit::Forced)
//!
//! start routine: register signal listeners ─► sequence.start(ctx)
//! stop routine:  sequence.stop() ─► release signal listeners
//! signal(sig):   spawn { SignalReceived ─► stop() }
//! ```
//!
//! ## Stop decision table
//! Evaluated atomically under the phase lock, in order:
//! ```text
//! stop status != Pending  OR  start status == Canceling ─► ForcingStop, halt
//! start status is Pending / Running                     ─► CancelingStart, cancel start
//! otherwise                                             ─► StoppingApp, run stop
//! ```
//! The first row is the safety valve: a stop request arriving while shutdown
//! is already underway (or while a cancellation has not been observed yet)
//! halts instead of running the stop routine a second time.
//!
//! ## Preconditions
//! - `stop()` before `run()` returns [`LifecycleError::NotInitialized`].
//! - `run()` twice returns [`LifecycleError::AlreadyRunning`].
//! - `stop()` after `run()` but before the body's first tick is recorded and
//!   applied as soon as the handles exist ([`StopAction::Deferred`]).

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::builder::{Fanout, SupervisorBuilder};
use super::config::Config;
use super::run::{Exit, RunHandle};
use crate::error::{LifecycleError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::sequence::Sequence;
use crate::signals::{Signal, SignalGuard, SignalSource};
use crate::tasks::{RoutineFn, RoutineRef, TaskHandle, TaskStatus};

/// Outcome of a [`Supervisor::stop`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    /// The body has not run yet; the request is applied once it does.
    Deferred,
    /// The start routine was asked to cancel.
    CancelStart,
    /// The stop routine was started.
    RunStop,
    /// Shutdown was already underway; the lifecycle was halted.
    Forced,
}

/// Snapshot of both routine statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineStatuses {
    /// Status of the start routine.
    pub start: TaskStatus,
    /// Status of the stop routine.
    pub stop: TaskStatus,
}

#[derive(Clone)]
struct Routines {
    start: TaskHandle,
    stop: TaskHandle,
    runtime: Handle,
}

enum Phase {
    Idle,
    Scheduled { stop_requested: bool },
    Active(Routines),
}

/// Single-shot application lifecycle.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    sequence: Arc<dyn Sequence>,
    source: Arc<dyn SignalSource>,
    phase: Mutex<Phase>,
    signals: Mutex<Option<SignalGuard>>,
    halt: CancellationToken,
    runtime: OnceLock<Handle>,
    fanout: Mutex<Option<Fanout>>,
}

impl Supervisor {
    /// Creates a builder with the given configuration.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        sequence: Arc<dyn Sequence>,
        source: Arc<dyn SignalSource>,
        fanout: Option<Fanout>,
    ) -> Self {
        Self {
            cfg,
            bus,
            sequence,
            source,
            phase: Mutex::new(Phase::Idle),
            signals: Mutex::new(None),
            halt: CancellationToken::new(),
            runtime: OnceLock::new(),
            fanout: Mutex::new(fanout),
        }
    }

    /// Configuration this supervisor was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Receiver for every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Statuses of the start and stop routines, once the body created them.
    pub fn statuses(&self) -> Option<RoutineStatuses> {
        match &*self.phase.lock() {
            Phase::Active(routines) => Some(RoutineStatuses {
                start: routines.start.status(),
                stop: routines.stop.status(),
            }),
            _ => None,
        }
    }

    /// Returns `true` while signal listeners are registered.
    pub fn signals_registered(&self) -> bool {
        self.signals.lock().is_some()
    }

    /// Returns `true` once a forced stop halted the lifecycle.
    pub fn is_halted(&self) -> bool {
        self.halt.is_cancelled()
    }

    /// Schedules the lifecycle on the current tokio runtime and returns immediately.
    ///
    /// Nothing runs on the caller's stack: the body starts on a spawned task.
    pub fn run(self: &Arc<Self>) -> Result<RunHandle, LifecycleError> {
        let runtime = Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;
        {
            let mut phase = self.phase.lock();
            if !matches!(*phase, Phase::Idle) {
                return Err(LifecycleError::AlreadyRunning);
            }
            *phase = Phase::Scheduled {
                stop_requested: false,
            };
            let _ = self.runtime.set(runtime.clone());
        }

        let body = runtime.spawn(Arc::clone(self).drive());
        let fanout = self.fanout.lock().take();
        Ok(RunHandle::new(body, self.halt.clone(), fanout))
    }

    /// Runs the lifecycle and waits for it to exit.
    pub async fn run_until_exit(self: &Arc<Self>) -> Result<Exit, LifecycleError> {
        Ok(self.run()?.wait().await)
    }

    /// Requests termination; safe to call repeatedly, from any task or thread.
    ///
    /// Never blocks: work is spawned on the runtime captured by [`run`](Self::run).
    /// See the module docs for the decision table.
    pub fn stop(&self) -> Result<StopAction, LifecycleError> {
        let mut phase = self.phase.lock();
        match &mut *phase {
            Phase::Idle => Err(LifecycleError::NotInitialized),
            Phase::Scheduled { stop_requested } => {
                *stop_requested = true;
                Ok(StopAction::Deferred)
            }
            Phase::Active(routines) => Ok(self.decide(routines)),
        }
    }

    /// Handles a termination signal on the next tick: logs it, then calls [`stop`](Self::stop).
    ///
    /// Callable from any thread once [`run`](Self::run) succeeded; before that
    /// the signal is only logged.
    pub fn signal(self: &Arc<Self>, signal: Signal) {
        let Some(runtime) = self.runtime.get() else {
            self.publish(Event::new(EventKind::SignalReceived).with_signal(signal));
            return;
        };
        let this = Arc::clone(self);
        runtime.spawn(async move {
            this.publish(Event::new(EventKind::SignalReceived).with_signal(signal));
            let _ = this.stop();
        });
    }

    async fn drive(self: Arc<Self>) {
        let runtime = Handle::current();
        if runtime.runtime_flavor() == RuntimeFlavor::CurrentThread {
            self.publish(Event::new(EventKind::SingleThreadRuntime));
        }

        let routines = Routines {
            start: TaskHandle::new(self.start_routine()),
            stop: TaskHandle::new(self.stop_routine()),
            runtime,
        };
        self.publish(Event::new(EventKind::AppStarting).with_app(self.cfg.app.to_string()));
        self.activate(&routines);

        routines.start.run_on(&routines.runtime);
        let started = routines.start.wait().await;
        if self.is_halted() {
            return;
        }
        match started {
            Ok(()) => self.publish(Event::new(EventKind::AppStarted)),
            Err(TaskError::Canceled) => {
                self.publish(Event::new(EventKind::StartCanceled));
                self.request_stop();
            }
            Err(err) => {
                self.publish(Event::new(EventKind::StartFailed).with_reason(err.to_string()));
                self.request_stop();
            }
        }

        let stopped = routines.stop.wait().await;
        if self.is_halted() {
            return;
        }
        match stopped {
            Ok(()) => self.publish(Event::new(EventKind::AppStopped)),
            Err(err) => {
                self.publish(Event::new(EventKind::StopFailed).with_reason(err.to_string()));
                self.request_stop();
            }
        }
    }

    /// Installs the routines and applies a stop request made before the first tick.
    fn activate(&self, routines: &Routines) {
        let mut phase = self.phase.lock();
        let deferred = matches!(
            *phase,
            Phase::Scheduled {
                stop_requested: true
            }
        );
        *phase = Phase::Active(routines.clone());
        if deferred {
            self.decide(routines);
        }
    }

    fn request_stop(&self) {
        // The body only calls this once the phase is Active.
        let _ = self.stop();
    }

    fn decide(&self, routines: &Routines) -> StopAction {
        let start = routines.start.status();
        if routines.stop.status() != TaskStatus::Pending || start == TaskStatus::Canceling {
            self.publish(Event::new(EventKind::ForcingStop));
            self.force_halt(routines);
            return StopAction::Forced;
        }

        if start.is_cancelable() {
            self.publish(Event::new(EventKind::CancelingStart));
            if routines.start.cancel() {
                return StopAction::CancelStart;
            }
            // Start reached a terminal status since the snapshot.
        }

        self.publish(Event::new(EventKind::StoppingApp));
        routines.stop.run_on(&routines.runtime);
        StopAction::RunStop
    }

    fn force_halt(&self, routines: &Routines) {
        // Cancel first: a registration racing with the release sees the halt.
        self.halt.cancel();
        routines.start.abort();
        routines.stop.abort();
        self.release_signals();
    }

    fn start_routine(self: &Arc<Self>) -> RoutineRef {
        let weak = Arc::downgrade(self);
        RoutineFn::arc("app-start", move |ctx: CancellationToken| {
            let weak = weak.clone();
            async move {
                let Some(this) = weak.upgrade() else {
                    return Err(TaskError::Canceled);
                };
                this.register_signals()?;
                this.sequence.start(ctx).await
            }
        })
    }

    fn stop_routine(self: &Arc<Self>) -> RoutineRef {
        let weak = Arc::downgrade(self);
        RoutineFn::arc("app-stop", move |_ctx: CancellationToken| {
            let weak = weak.clone();
            async move {
                let Some(this) = weak.upgrade() else {
                    return Err(TaskError::Canceled);
                };
                let res = this.sequence.stop().await;
                this.release_signals();
                res
            }
        })
    }

    fn register_signals(self: &Arc<Self>) -> Result<(), TaskError> {
        let weak = Arc::downgrade(self);
        let guard = SignalGuard::register(self.source.as_ref(), &self.cfg.signals, move |signal| {
            if let Some(this) = weak.upgrade() {
                this.signal(signal);
            }
        })?;
        {
            let mut slot = self.signals.lock();
            if self.is_halted() {
                guard.release();
                return Err(TaskError::Canceled);
            }
            *slot = Some(guard);
        }
        self.publish(Event::new(EventKind::SignalsRegistered));
        Ok(())
    }

    fn release_signals(&self) {
        let guard = self.signals.lock().take();
        if let Some(guard) = guard {
            guard.release();
            self.publish(Event::new(EventKind::SignalsUnregistered));
        }
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }
}
