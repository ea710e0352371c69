use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// A resource with a start and a stop step: a listener, a connection pool, a worker.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use appvisor::{Service, TaskError};
///
/// struct Cache;
///
/// #[async_trait]
/// impl Service for Cache {
///     fn name(&self) -> &str { "cache" }
///
///     async fn start(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         Ok(())
///     }
///
///     async fn stop(&self) -> Result<(), TaskError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Stable, human-readable name.
    fn name(&self) -> &str;

    /// Starts the service.
    async fn start(&self, ctx: CancellationToken) -> Result<(), TaskError>;

    /// Stops the service. Only called after `start` succeeded.
    async fn stop(&self) -> Result<(), TaskError>;
}
