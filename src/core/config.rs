//! # Supervisor configuration.
//!
//! Provides [`Config`] centralized settings for one application lifecycle.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `signals = []` → the lifecycle only stops through [`Supervisor::stop`](crate::Supervisor::stop)
//! - `log.level = None` → `logging::init` installs nothing

use std::fmt;

use crate::signals::Signal;

/// Identity of the supervised application, rendered as `vendor/domain.name`.
///
/// # Example
/// ```
/// use appvisor::AppIdentity;
///
/// let id = AppIdentity::new("api").with_vendor("acme").with_domain("billing");
/// assert_eq!(id.to_string(), "acme/billing.api");
/// assert_eq!(AppIdentity::new("api").to_string(), "api");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppIdentity {
    /// Organisation publishing the application.
    pub vendor: Option<String>,
    /// Product area the application belongs to.
    pub domain: Option<String>,
    /// Application name.
    pub name: String,
}

impl AppIdentity {
    /// Identity with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            vendor: None,
            domain: None,
            name: name.into(),
        }
    }

    /// Sets the vendor.
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Sets the domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self::new("app")
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(vendor) = &self.vendor {
            write!(f, "{vendor}/")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "{domain}.")?;
        }
        f.write_str(&self.name)
    }
}

/// Local log output settings, consumed by `logging::init` (feature `logging`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives (e.g. `"info"` or `"appvisor=debug,info"`).
    ///
    /// `None` disables local log output.
    pub level: Option<String>,
    /// Colored output.
    pub ansi: bool,
}

/// Configuration of a [`Supervisor`](crate::Supervisor).
///
/// ## Field semantics
/// - `app`: identity named in the "starting" event
/// - `signals`: termination signals listened for while the application is active
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `log`: local log output
#[derive(Clone, Debug)]
pub struct Config {
    /// Application identity.
    pub app: AppIdentity,

    /// Signals that trigger [`Supervisor::signal`](crate::Supervisor::signal).
    pub signals: Vec<Signal>,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging behind more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Local log output.
    pub log: LogConfig,
}

impl Config {
    /// Default configuration for the named application.
    pub fn for_app(app: AppIdentity) -> Self {
        Self {
            app,
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `app = "app"`
    /// - `signals = [SIGINT, SIGTERM]`
    /// - `bus_capacity = 1024`
    /// - `log` disabled
    fn default() -> Self {
        Self {
            app: AppIdentity::default(),
            signals: vec![Signal::Interrupt, Signal::Terminate],
            bus_capacity: 1024,
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_for_both_termination_signals() {
        let cfg = Config::default();
        assert_eq!(cfg.signals, vec![Signal::Interrupt, Signal::Terminate]);
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
        assert!(cfg.log.level.is_none());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn identity_skips_missing_parts() {
        let id = AppIdentity::new("worker").with_domain("jobs");
        assert_eq!(id.to_string(), "jobs.worker");
        let cfg = Config::for_app(AppIdentity::new("worker").with_vendor("acme"));
        assert_eq!(cfg.app.to_string(), "acme/worker");
    }
}
