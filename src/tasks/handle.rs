//! # TaskHandle: one routine with an observable status.
//!
//! A [`TaskHandle`] wraps a [`Routine`] that has not started yet. It can be
//! run once, awaited by any number of callers, and canceled cooperatively.
//!
//! ## Status machine
//! ```text
//!            run()                  routine Ok
//! Pending ─────────► Running ───────────────────────► Completed
//!    │                  │   routine Err(Canceled)  ──► Canceled
//!    │                  │   routine Err(other)     ──► Failed
//!    │ cancel()         │ cancel()
//!    ▼                  ▼
//! Canceled          Canceling ──── routine ends (any result) ──► Canceled
//! ```
//!
//! ## Rules
//! - Transitions are atomic (`watch::Sender::send_if_modified`), so `run()` and
//!   `cancel()` racing from different tasks always agree on who won.
//! - Cancellation is cooperative: the token passed to the routine is triggered,
//!   the routine decides when to return. Once requested, cancellation wins over
//!   whatever the routine returns.
//! - A panic inside the routine is caught and reported as [`TaskError::Panicked`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::error::{TaskError, panic_info};
use crate::tasks::routine::RoutineRef;

/// Observable status of a [`TaskHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Created, not started.
    Pending,
    /// Routine is executing.
    Running,
    /// Cancellation requested, routine has not returned yet.
    Canceling,
    /// Routine returned `Ok(())`.
    Completed,
    /// Routine returned an error or panicked.
    Failed,
    /// Routine was canceled (before or while running).
    Canceled,
}

impl TaskStatus {
    /// Returns `true` for `Completed`, `Failed` and `Canceled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    /// Returns `true` while a cancellation request still has an effect.
    pub fn is_cancelable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Canceling => "canceling",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
        }
    }
}

struct Inner {
    routine: RoutineRef,
    token: CancellationToken,
    status: watch::Sender<TaskStatus>,
    failure: Mutex<Option<TaskError>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn finish(&self, res: Result<(), TaskError>) {
        self.status.send_modify(|status| {
            let next = match (*status, res) {
                (current, _) if current.is_terminal() => current,
                (TaskStatus::Canceling, _) => TaskStatus::Canceled,
                (_, Ok(())) => TaskStatus::Completed,
                (_, Err(TaskError::Canceled)) => TaskStatus::Canceled,
                (_, Err(err)) => {
                    *self.failure.lock() = Some(err);
                    TaskStatus::Failed
                }
            };
            *status = next;
        });
    }
}

/// Handle over a single run of a [`Routine`](crate::Routine).
///
/// Cloning the handle shares the same run.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<Inner>,
}

impl TaskHandle {
    /// Wraps `routine`; nothing executes until [`run`](Self::run).
    pub fn new(routine: RoutineRef) -> Self {
        let (status, _) = watch::channel(TaskStatus::Pending);
        Self {
            inner: Arc::new(Inner {
                routine,
                token: CancellationToken::new(),
                status,
                failure: Mutex::new(None),
                join: Mutex::new(None),
            }),
        }
    }

    /// Name of the wrapped routine.
    pub fn name(&self) -> &str {
        self.inner.routine.name()
    }

    /// Current status snapshot.
    pub fn status(&self) -> TaskStatus {
        *self.inner.status.borrow()
    }

    /// Starts the routine on the current tokio runtime.
    ///
    /// Returns `false` (and does nothing) unless the handle is `Pending` and
    /// the caller is inside a runtime. Use [`run_on`](Self::run_on) from other threads.
    pub fn run(&self) -> bool {
        match Handle::try_current() {
            Ok(runtime) => self.run_on(&runtime),
            Err(_) => false,
        }
    }

    /// Starts the routine on `runtime`; callable from any thread.
    ///
    /// Returns `false` (and does nothing) unless the handle is `Pending`.
    pub fn run_on(&self, runtime: &Handle) -> bool {
        // Held across the spawn so abort() always finds the join handle.
        let mut join = self.inner.join.lock();
        let started = self.inner.status.send_if_modified(|status| {
            if *status == TaskStatus::Pending {
                *status = TaskStatus::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return false;
        }

        let inner = Arc::clone(&self.inner);
        let fut = inner.routine.spawn(inner.token.clone());
        let handle = runtime.spawn(async move {
            let res = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => Err(TaskError::Panicked {
                    info: panic_info(&*payload),
                }),
            };
            inner.finish(res);
        });
        *join = Some(handle);
        true
    }

    /// Requests cooperative cancellation.
    ///
    /// `Pending` becomes `Canceled` (the routine never runs), `Running` becomes
    /// `Canceling`. Returns `false` when the status allowed neither.
    pub fn cancel(&self) -> bool {
        let requested = self.inner.status.send_if_modified(|status| match *status {
            TaskStatus::Pending => {
                *status = TaskStatus::Canceled;
                true
            }
            TaskStatus::Running => {
                *status = TaskStatus::Canceling;
                true
            }
            _ => false,
        });
        if requested {
            self.inner.token.cancel();
        }
        requested
    }

    /// Aborts the routine without waiting for it, marking the handle `Canceled`
    /// unless it already reached a terminal status.
    pub fn abort(&self) {
        if let Some(join) = self.inner.join.lock().take() {
            join.abort();
        }
        self.inner.token.cancel();
        self.inner.status.send_if_modified(|status| {
            if status.is_terminal() {
                false
            } else {
                *status = TaskStatus::Canceled;
                true
            }
        });
    }

    /// Waits until the handle reaches a terminal status.
    ///
    /// Returns `Ok(())` for `Completed`, [`TaskError::Canceled`] for `Canceled`
    /// and the routine's error for `Failed`.
    pub async fn wait(&self) -> Result<(), TaskError> {
        let mut rx = self.inner.status.subscribe();
        let status = rx
            .wait_for(TaskStatus::is_terminal)
            .await
            .map(|status| *status)
            .unwrap_or(TaskStatus::Canceled);

        match status {
            TaskStatus::Completed => Ok(()),
            TaskStatus::Failed => Err(self
                .inner
                .failure
                .lock()
                .clone()
                .unwrap_or_else(|| TaskError::fail("unknown failure"))),
            _ => Err(TaskError::Canceled),
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}
