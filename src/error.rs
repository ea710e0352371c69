//! Error types used by the appvisor runtime and its routines.
//!
//! This module defines two main error enums:
//!
//! - [`LifecycleError`] - misuse of the supervisor API (precondition violations).
//! - [`TaskError`] - outcomes of a start/stop routine other than success.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! A [`TaskError`] never reaches the host: the supervisor turns it into an
//! event and a state transition.

use thiserror::Error;

/// # Errors produced by the supervisor API.
///
/// These are precondition violations of the single-shot lifecycle, plus
/// failures installing the optional logger.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `stop()` was called before `run()`.
    #[error("supervisor is not running; call run() before stop()")]
    NotInitialized,

    /// `run()` was called a second time on the same supervisor.
    #[error("supervisor lifecycle is single-shot; run() was already called")]
    AlreadyRunning,

    /// `run()` was called outside of a tokio runtime.
    #[error("no tokio runtime is available to schedule the lifecycle")]
    NoRuntime,

    /// The logger could not be installed.
    #[error("failed to initialize logging: {error}")]
    Logging {
        /// The underlying error message.
        error: String,
    },
}

impl LifecycleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::LifecycleError;
    ///
    /// assert_eq!(LifecycleError::AlreadyRunning.as_label(), "lifecycle_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::NotInitialized => "lifecycle_not_initialized",
            LifecycleError::AlreadyRunning => "lifecycle_already_running",
            LifecycleError::NoRuntime => "lifecycle_no_runtime",
            LifecycleError::Logging { .. } => "lifecycle_logging",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LifecycleError::NotInitialized => "stop requested before run".to_string(),
            LifecycleError::AlreadyRunning => "run requested twice".to_string(),
            LifecycleError::NoRuntime => "no tokio runtime".to_string(),
            LifecycleError::Logging { error } => format!("logging: {error}"),
        }
    }
}

/// # Errors produced by a routine.
///
/// A start or stop routine either succeeds, fails, is canceled, or panics.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Routine failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Routine was canceled before it could complete.
    #[error("canceled")]
    Canceled,

    /// Routine panicked; the panic was caught.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TaskError {
    /// Builds a [`TaskError::Fail`] from anything displayable.
    ///
    /// # Example
    /// ```
    /// use appvisor::TaskError;
    ///
    /// let err = TaskError::fail("connection refused");
    /// assert_eq!(err.to_string(), "execution failed: connection refused");
    /// ```
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "canceled".to_string(),
            TaskError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// Returns `true` for [`TaskError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::fail(err)
    }
}
