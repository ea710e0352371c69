//! # Routine abstraction and function-backed implementation.
//!
//! A [`Routine`] is one asynchronous, cooperatively cancelable unit of work:
//! the start routine or the stop routine of an application. It receives a
//! [`CancellationToken`] and should observe it to stop early.
//!
//! [`RoutineFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a
//! fresh future per call.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use appvisor::{RoutineFn, RoutineRef, TaskError};
//!
//! let r: RoutineRef = RoutineFn::arc("warmup", |ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(TaskError::Canceled);
//!     }
//!     Ok(())
//! });
//!
//! assert_eq!(r.name(), "warmup");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future returned by [`Routine::spawn`].
pub type BoxRoutineFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a routine.
pub type RoutineRef = Arc<dyn Routine>;

/// Asynchronous, cancelable unit of work.
pub trait Routine: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Creates the future executing the routine.
    ///
    /// Implementations should watch `ctx` and return [`TaskError::Canceled`]
    /// promptly once it fires.
    fn spawn(&self, ctx: CancellationToken) -> BoxRoutineFuture;
}

/// Function-backed routine.
#[derive(Debug)]
pub struct RoutineFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> RoutineFn<F> {
    /// Creates a new function-backed routine.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the routine and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Routine for RoutineFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: CancellationToken) -> BoxRoutineFuture {
        Box::pin((self.f)(ctx))
    }
}
