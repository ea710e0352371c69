//! Runtime core: configuration and lifecycle.
//!
//! The public API from this module is [`Supervisor`], built through
//! [`SupervisorBuilder`] and driven through [`RunHandle`].
//!
//! Internal modules:
//! - [`supervisor`]: phase tracking, the stop decision table, start/stop routines;
//! - [`run`]: waiting for the lifecycle outcome;
//! - [`builder`]: wires the bus, subscribers, sequence and signal source;
//! - [`config`]: application identity and settings.

mod builder;
mod config;
mod run;
mod supervisor;

#[cfg(test)]
mod tests;

pub use builder::SupervisorBuilder;
pub use config::{AppIdentity, Config, LogConfig};
pub use run::{Exit, RunHandle};
pub use supervisor::{RoutineStatuses, StopAction, Supervisor};
