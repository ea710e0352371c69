//! # appvisor
//!
//! **Appvisor** supervises the lifecycle of one application: start it, keep it
//! running, stop it on request or on a termination signal, and halt it when a
//! second stop arrives while shutdown is already underway.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                  ┌──────────────────────────────┐
//!   run() ────────►│          Supervisor          │◄──────── stop() / signal(sig)
//!                  │  - Phase (Idle/Scheduled/    │
//!                  │    Active{start, stop})      │
//!                  │  - SignalGuard (while active)│
//!                  │  - halt token                │
//!                  └──────┬───────────────┬───────┘
//!                         ▼               ▼
//!                ┌──────────────┐  ┌──────────────┐
//!                │ TaskHandle   │  │ TaskHandle   │
//!                │ (start)      │  │ (stop)       │
//!                └──────┬───────┘  └──────┬───────┘
//!                       ▼                 ▼
//!              Sequence::start(ctx)  Sequence::stop()
//!                       │                 │
//!                       └────────┬────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │           Bus (broadcast channel, every event also traced)        │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 ▼
//!                           SubscriberSet
//!                        (per-subscriber queues)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Start ──► Running ──► Stop
//!   │                    ▲
//!   └── canceled/failed ─┘        second stop() while stopping ──► forced halt
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use appvisor::{AppIdentity, Config, Service, Supervisor, TaskError};
//!
//! struct Http;
//!
//! #[async_trait]
//! impl Service for Http {
//!     fn name(&self) -> &str { "http" }
//!     async fn start(&self, _ctx: CancellationToken) -> Result<(), TaskError> { Ok(()) }
//!     async fn stop(&self) -> Result<(), TaskError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = Config::for_app(AppIdentity::new("api").with_vendor("acme"));
//!     let sup = Supervisor::builder(cfg).with_service(Arc::new(Http)).build();
//!
//!     // Runs until SIGINT/SIGTERM (or sup.stop()) brings the app down.
//!     let exit = sup.run_until_exit().await.expect("tokio runtime");
//!     std::process::exit(exit.code());
//! }
//! ```
mod core;
mod error;
mod events;
mod sequence;
mod signals;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::core::{
    AppIdentity, Config, Exit, LogConfig, RoutineStatuses, RunHandle, StopAction, Supervisor,
    SupervisorBuilder,
};
pub use error::{LifecycleError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use sequence::{Sequence, Service, ServiceRef, StartStopSequence};
pub use signals::{ManualSignals, OsSignals, Signal, SignalGuard, SignalSource, SignalStream};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxRoutineFuture, Routine, RoutineFn, RoutineRef, TaskHandle, TaskStatus};

// Optional: install a tracing-subscriber fmt logger.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub mod logging;
