//! # Local log output.
//!
//! Every lifecycle event goes through `tracing` at its [`EventKind::level`](crate::EventKind::level).
//! [`init`] installs a `tracing-subscriber` fmt subscriber so those records
//! reach stderr; hosts that already install their own subscriber skip it.
//!
//! # Example
//! ```no_run
//! use appvisor::{logging, LogConfig};
//!
//! let cfg = LogConfig { level: Some("info".into()), ansi: true };
//! logging::init(&cfg).expect("logger");
//! ```

use tracing_subscriber::EnvFilter;

use crate::{LifecycleError, LogConfig};

/// Installs the global fmt subscriber described by `cfg`.
///
/// Returns `Ok(false)` without installing anything when `cfg.level` is `None`.
/// An invalid filter directive or an already installed global subscriber is
/// reported as [`LifecycleError::Logging`].
pub fn init(cfg: &LogConfig) -> Result<bool, LifecycleError> {
    let Some(level) = cfg.level.as_deref() else {
        return Ok(false);
    };

    let filter = EnvFilter::try_new(level).map_err(|e| LifecycleError::Logging {
        error: e.to_string(),
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(cfg.ansi)
        .with_target(false)
        .try_init()
        .map_err(|e| LifecycleError::Logging {
            error: e.to_string(),
        })?;
    Ok(true)
}
