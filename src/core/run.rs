//! # Running lifecycle handle.
//!
//! [`RunHandle`] is returned by [`Supervisor::run`](crate::Supervisor::run).
//! Waiting on it resolves once the lifecycle is over:
//!
//! ```text
//! body finished, not halted ──► drain subscribers ──► Exit::Graceful
//! halt token fired          ──► abort body        ──► Exit::Forced
//! ```
//!
//! On a forced exit subscribers keep draining in the background; `wait` does
//! not block on them.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::Fanout;

/// How the lifecycle ended.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Start and stop ran to their end without a forced stop.
    Graceful,
    /// A forced stop halted the lifecycle.
    Forced,
}

impl Exit {
    /// Returns `true` for [`Exit::Graceful`].
    pub fn is_graceful(&self) -> bool {
        matches!(self, Exit::Graceful)
    }

    /// Process exit code: `0` when graceful, `1` when forced.
    pub fn code(&self) -> i32 {
        match self {
            Exit::Graceful => 0,
            Exit::Forced => 1,
        }
    }
}

/// Handle over a running lifecycle.
#[must_use = "a lifecycle is usually awaited with RunHandle::wait"]
#[derive(Debug)]
pub struct RunHandle {
    body: JoinHandle<()>,
    halt: CancellationToken,
    fanout: Option<Fanout>,
}

impl RunHandle {
    pub(crate) fn new(
        body: JoinHandle<()>,
        halt: CancellationToken,
        fanout: Option<Fanout>,
    ) -> Self {
        Self { body, halt, fanout }
    }

    /// Returns `true` once the lifecycle body finished.
    pub fn is_finished(&self) -> bool {
        self.body.is_finished()
    }

    /// Waits for the lifecycle to end.
    ///
    /// After a graceful exit, returns once every subscriber handled the events
    /// published so far.
    pub async fn wait(mut self) -> Exit {
        let exit = tokio::select! {
            biased;
            _ = self.halt.cancelled() => {
                self.body.abort();
                Exit::Forced
            }
            res = &mut self.body => {
                if res.is_err() || self.halt.is_cancelled() {
                    Exit::Forced
                } else {
                    Exit::Graceful
                }
            }
        };

        if let Some(fanout) = self.fanout.take()
            && exit.is_graceful()
        {
            fanout.close().await;
        }
        exit
    }
}
