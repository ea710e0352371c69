use std::io;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::Level;

use super::*;
use crate::error::{LifecycleError, TaskError};
use crate::events::{Event, EventKind};
use crate::sequence::Sequence;
use crate::signals::{ManualSignals, Signal, SignalSource, SignalStream};
use crate::subscribers::Subscribe;
use crate::tasks::TaskStatus;

/// Sequence whose start and stop behave as each test scripts them.
#[derive(Default)]
struct Scripted {
    /// Start waits for this gate (or for cancellation, unless `stubborn`).
    start_gate: Option<Arc<Notify>>,
    stubborn: bool,
    fail_start: Option<&'static str>,
    /// Stop waits for this gate.
    stop_gate: Option<Arc<Notify>>,
    fail_stop: Option<&'static str>,
    journal: Mutex<Vec<&'static str>>,
}

impl Scripted {
    fn journal(&self) -> Vec<&'static str> {
        self.journal.lock().clone()
    }
}

#[async_trait]
impl Sequence for Scripted {
    async fn start(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        self.journal.lock().push("start");
        if let Some(gate) = &self.start_gate {
            if self.stubborn {
                gate.notified().await;
            } else {
                tokio::select! {
                    _ = gate.notified() => {}
                    _ = ctx.cancelled() => return Err(TaskError::Canceled),
                }
            }
        }
        match self.fail_start {
            Some(msg) => Err(TaskError::fail(msg)),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), TaskError> {
        self.journal.lock().push("stop");
        if let Some(gate) = &self.stop_gate {
            gate.notified().await;
        }
        match self.fail_stop {
            Some(msg) => Err(TaskError::fail(msg)),
            None => Ok(()),
        }
    }
}

fn supervisor(seq: &Arc<Scripted>, signals: &Arc<ManualSignals>) -> Arc<Supervisor> {
    Supervisor::builder(Config::for_app(AppIdentity::new("orders").with_vendor("acme")))
        .with_sequence(seq.clone())
        .with_signal_source(signals.clone())
        .build()
}

async fn until(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(|ev| ev.kind).collect()
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|ev| ev.kind == kind).count()
}

fn start_completed(sup: &Supervisor) -> bool {
    sup.statuses().map(|s| s.start) == Some(TaskStatus::Completed)
}

#[tokio::test]
async fn signal_after_start_stops_gracefully() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted::default());
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;
    assert!(sup.signals_registered());
    assert!(signals.raise(Signal::Terminate));

    assert_eq!(handle.wait().await, Exit::Graceful);
    assert_eq!(seq.journal(), vec!["start", "stop"]);

    let events = drain(&mut rx);
    let info: Vec<_> = events
        .iter()
        .filter(|ev| ev.kind.level() == Level::INFO)
        .map(|ev| ev.kind)
        .collect();
    assert_eq!(
        info,
        vec![
            EventKind::AppStarting,
            EventKind::AppStarted,
            EventKind::AppStopped
        ]
    );

    let starting = events
        .iter()
        .find(|ev| ev.kind == EventKind::AppStarting)
        .expect("starting event");
    assert_eq!(starting.message(), "Starting app acme/orders...");

    let received = events
        .iter()
        .find(|ev| ev.kind == EventKind::SignalReceived)
        .expect("signal event");
    assert_eq!(received.signal, Some(Signal::Terminate));
    assert_eq!(count(&events, EventKind::StoppingApp), 1);

    assert!(events.iter().all(|ev| ev.kind.level() != Level::ERROR));
    let warnings: Vec<_> = events
        .iter()
        .filter(|ev| ev.kind.level() == Level::WARN)
        .map(|ev| ev.kind)
        .collect();
    assert_eq!(
        warnings,
        vec![EventKind::SingleThreadRuntime, EventKind::SignalReceived]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_from_a_thread_outside_the_runtime_is_graceful() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted::default());
    let sup = supervisor(&seq, &signals);

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;

    let remote = Arc::clone(&sup);
    let action = std::thread::spawn(move || remote.stop())
        .join()
        .expect("thread");
    assert_eq!(action, Ok(StopAction::RunStop));

    assert_eq!(handle.wait().await, Exit::Graceful);
    assert_eq!(seq.journal(), vec!["start", "stop"]);
    assert!(!sup.is_halted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn signal_from_a_thread_outside_the_runtime_is_graceful() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted::default());
    let sup = supervisor(&seq, &signals);

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;

    let remote = Arc::clone(&sup);
    std::thread::spawn(move || remote.signal(Signal::Interrupt))
        .join()
        .expect("thread");

    assert_eq!(handle.wait().await, Exit::Graceful);
    assert_eq!(seq.journal(), vec!["start", "stop"]);
}

#[tokio::test]
async fn signal_handlers_are_released_after_stop() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted::default());
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;
    assert_eq!(signals.active(), 2);

    assert_eq!(sup.stop(), Ok(StopAction::RunStop));
    assert_eq!(handle.wait().await, Exit::Graceful);

    assert!(!sup.signals_registered());
    until(|| signals.active() == 0).await;
    assert!(!signals.raise(Signal::Interrupt));

    let kinds = kinds(&drain(&mut rx));
    let registered = kinds.iter().position(|k| *k == EventKind::SignalsRegistered);
    let unregistered = kinds.iter().position(|k| *k == EventKind::SignalsUnregistered);
    assert!(matches!((registered, unregistered), (Some(r), Some(u)) if r < u));
}

#[tokio::test]
async fn stop_before_first_tick_is_deferred_and_cancels_start() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted::default());
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    assert_eq!(sup.stop(), Ok(StopAction::Deferred));
    assert_eq!(sup.stop(), Ok(StopAction::Deferred));

    assert_eq!(handle.wait().await, Exit::Graceful);
    // The start routine never ran, so neither did the sequence start.
    assert_eq!(seq.journal(), vec!["stop"]);
    assert_eq!(signals.active(), 0);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::CancelingStart), 1);
    assert_eq!(count(&events, EventKind::StartCanceled), 1);
    assert_eq!(count(&events, EventKind::StoppingApp), 1);
    assert_eq!(count(&events, EventKind::AppStopped), 1);
    assert_eq!(count(&events, EventKind::ForcingStop), 0);
    assert_eq!(
        sup.statuses(),
        Some(RoutineStatuses {
            start: TaskStatus::Canceled,
            stop: TaskStatus::Completed,
        })
    );
}

#[tokio::test]
async fn failed_start_still_runs_stop() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted {
        fail_start: Some("db unreachable"),
        ..Scripted::default()
    });
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let exit = sup.run_until_exit().await.expect("run");
    assert_eq!(exit, Exit::Graceful);
    assert_eq!(seq.journal(), vec!["start", "stop"]);

    let events = drain(&mut rx);
    let failed = events
        .iter()
        .find(|ev| ev.kind == EventKind::StartFailed)
        .expect("start failure event");
    assert!(failed.reason.as_deref().unwrap_or_default().contains("db unreachable"));
    assert_eq!(count(&events, EventKind::AppStarted), 0);
    assert_eq!(count(&events, EventKind::AppStopped), 1);
    assert!(!sup.signals_registered());
}

#[tokio::test]
async fn signal_during_start_cancels_it() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted {
        start_gate: Some(Arc::new(Notify::new())),
        ..Scripted::default()
    });
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    until(|| sup.signals_registered()).await;
    assert!(signals.raise(Signal::Interrupt));

    assert_eq!(handle.wait().await, Exit::Graceful);
    assert_eq!(seq.journal(), vec!["start", "stop"]);

    let kinds = kinds(&drain(&mut rx));
    let expected = [
        EventKind::SignalReceived,
        EventKind::CancelingStart,
        EventKind::StartCanceled,
        EventKind::StoppingApp,
        EventKind::AppStopped,
    ];
    let observed: Vec<_> = kinds
        .into_iter()
        .filter(|k| expected.contains(k))
        .collect();
    assert_eq!(observed, expected);
}

#[tokio::test]
async fn second_signal_while_canceling_forces() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted {
        start_gate: Some(Arc::new(Notify::new())),
        stubborn: true,
        ..Scripted::default()
    });
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    until(|| sup.signals_registered()).await;
    assert!(signals.raise(Signal::Terminate));
    until(|| sup.statuses().map(|s| s.start) == Some(TaskStatus::Canceling)).await;
    assert!(signals.raise(Signal::Terminate));

    assert_eq!(handle.wait().await, Exit::Forced);
    assert!(sup.is_halted());
    assert!(!sup.signals_registered());
    assert_eq!(seq.journal(), vec!["start"]);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::SignalReceived), 2);
    assert_eq!(count(&events, EventKind::ForcingStop), 1);
    assert_eq!(count(&events, EventKind::StoppingApp), 0);
}

#[tokio::test]
async fn second_stop_while_stopping_forces() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted {
        stop_gate: Some(Arc::new(Notify::new())),
        ..Scripted::default()
    });
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;

    assert_eq!(sup.stop(), Ok(StopAction::RunStop));
    assert_eq!(sup.stop(), Ok(StopAction::Forced));
    assert_eq!(handle.wait().await, Exit::Forced);

    assert!(!sup.signals_registered());
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::ForcingStop), 1);
    assert_eq!(count(&events, EventKind::AppStopped), 0);
}

#[tokio::test]
async fn failed_stop_forces() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted {
        fail_stop: Some("flush failed"),
        ..Scripted::default()
    });
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;
    assert_eq!(sup.stop(), Ok(StopAction::RunStop));

    assert_eq!(handle.wait().await, Exit::Forced);
    // Listeners are released even though the stop failed.
    assert!(!sup.signals_registered());

    let events = drain(&mut rx);
    let failed = events
        .iter()
        .find(|ev| ev.kind == EventKind::StopFailed)
        .expect("stop failure event");
    assert!(failed.reason.as_deref().unwrap_or_default().contains("flush failed"));
    assert_eq!(count(&events, EventKind::ForcingStop), 1);
    assert_eq!(count(&events, EventKind::AppStopped), 0);
}

#[tokio::test]
async fn stop_after_exit_forces() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted::default());
    let sup = supervisor(&seq, &signals);

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;
    assert_eq!(sup.stop(), Ok(StopAction::RunStop));
    assert_eq!(handle.wait().await, Exit::Graceful);

    assert_eq!(sup.stop(), Ok(StopAction::Forced));
    assert!(sup.is_halted());
    assert_eq!(seq.journal(), vec!["start", "stop"]);
}

#[test]
fn stop_before_run_is_rejected() {
    let signals = Arc::new(ManualSignals::new());
    let sup = supervisor(&Arc::new(Scripted::default()), &signals);

    assert_eq!(sup.stop(), Err(LifecycleError::NotInitialized));
    assert_eq!(sup.statuses(), None);
}

#[test]
fn run_outside_runtime_is_rejected() {
    let signals = Arc::new(ManualSignals::new());
    let sup = supervisor(&Arc::new(Scripted::default()), &signals);

    assert_eq!(sup.run().unwrap_err(), LifecycleError::NoRuntime);
    // Still idle: the failed call did not consume the lifecycle.
    assert_eq!(sup.stop(), Err(LifecycleError::NotInitialized));
}

#[tokio::test]
async fn run_twice_is_rejected() {
    let signals = Arc::new(ManualSignals::new());
    let sup = supervisor(&Arc::new(Scripted::default()), &signals);

    let handle = sup.run().expect("run");
    assert_eq!(sup.run().unwrap_err(), LifecycleError::AlreadyRunning);

    sup.stop().expect("stop");
    assert_eq!(handle.wait().await, Exit::Graceful);
}

#[tokio::test]
async fn current_thread_runtime_is_reported() {
    let signals = Arc::new(ManualSignals::new());
    let sup = supervisor(&Arc::new(Scripted::default()), &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    sup.stop().expect("stop");
    let _ = handle.wait().await;

    let events = drain(&mut rx);
    assert_eq!(events[0].kind, EventKind::SingleThreadRuntime);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn multi_thread_runtime_is_not_reported() {
    let signals = Arc::new(ManualSignals::new());
    let seq = Arc::new(Scripted::default());
    let sup = supervisor(&seq, &signals);
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;
    assert!(signals.raise(Signal::Interrupt));
    assert_eq!(handle.wait().await, Exit::Graceful);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::SingleThreadRuntime), 0);
    assert_eq!(count(&events, EventKind::AppStopped), 1);
}

struct Recorder {
    seen: Arc<Mutex<Vec<EventKind>>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.seen.lock().push(event.kind);
    }
}

#[tokio::test]
async fn subscribers_receive_lifecycle_events() {
    let signals = Arc::new(ManualSignals::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder: Arc<dyn Subscribe> = Arc::new(Recorder { seen: seen.clone() });
    let sup = Supervisor::builder(Config::default())
        .with_signal_source(signals.clone())
        .with_subscribers(vec![recorder])
        .build();

    let handle = sup.run().expect("run");
    until(|| start_completed(&sup)).await;
    sup.stop().expect("stop");
    assert_eq!(handle.wait().await, Exit::Graceful);

    // wait() returns only after the subscriber queues are drained.
    let seen = seen.lock().clone();
    assert!(seen.contains(&EventKind::AppStarting));
    assert!(seen.contains(&EventKind::AppStarted));
    assert_eq!(seen.last(), Some(&EventKind::AppStopped));
}

/// Forces a halt from inside `listen`, i.e. while the start routine registers.
struct HaltDuringRegistration {
    inner: ManualSignals,
    sup: OnceLock<Weak<Supervisor>>,
}

impl SignalSource for HaltDuringRegistration {
    fn listen(&self, signal: Signal) -> io::Result<SignalStream> {
        // First call cancels the start, the second one forces.
        if let Some(sup) = self.sup.get().and_then(Weak::upgrade) {
            let _ = sup.stop();
        }
        self.inner.listen(signal)
    }
}

#[tokio::test]
async fn halt_during_registration_leaves_no_listener() {
    let inner = ManualSignals::new();
    let source = Arc::new(HaltDuringRegistration {
        inner: inner.clone(),
        sup: OnceLock::new(),
    });
    let sup = Supervisor::builder(Config::default())
        .with_sequence(Arc::new(Scripted::default()))
        .with_signal_source(source.clone())
        .build();
    let _ = source.sup.set(Arc::downgrade(&sup));
    let mut rx = sup.subscribe();

    let handle = sup.run().expect("run");
    assert_eq!(handle.wait().await, Exit::Forced);

    assert!(!sup.signals_registered());
    until(|| inner.active() == 0).await;
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::SignalsRegistered), 0);
    assert_eq!(count(&events, EventKind::ForcingStop), 1);
}
