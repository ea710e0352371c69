//! # Start/stop sequences.
//!
//! The supervisor does not know what an application starts. It delegates to
//! a [`Sequence`]: one async `start` (receiving the cancellation token of the
//! start routine) and one async `stop`.
//!
//! [`StartStopSequence`] is the stock implementation: an ordered list of
//! [`Service`]s started front to back and stopped back to front.

mod service;
mod start_stop;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

pub use service::{Service, ServiceRef};
pub use start_stop::StartStopSequence;

/// What the supervisor starts and stops.
#[async_trait]
pub trait Sequence: Send + Sync + 'static {
    /// Brings the application up.
    ///
    /// `ctx` fires when the supervisor cancels the start; implementations
    /// should return [`TaskError::Canceled`] soon after.
    async fn start(&self, ctx: CancellationToken) -> Result<(), TaskError>;

    /// Tears the application down.
    async fn stop(&self) -> Result<(), TaskError>;
}
