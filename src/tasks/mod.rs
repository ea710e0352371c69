//! # Routines and task handles.
//!
//! - [`Routine`] - trait for an async cancelable unit of work
//! - [`RoutineFn`] - function-backed routine
//! - [`TaskHandle`] - single run of a routine with an observable [`TaskStatus`]

mod handle;
mod routine;

pub use handle::{TaskHandle, TaskStatus};
pub use routine::{BoxRoutineFuture, Routine, RoutineFn, RoutineRef};
