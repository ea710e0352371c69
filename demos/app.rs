//! # Application Lifecycle Example
//!
//! Starts two services (a database pool, then an HTTP listener), keeps them
//! running until SIGINT/SIGTERM, then stops them in reverse order.
//!
//! Press Ctrl-C once for a graceful stop. Press it again while the app is
//! stopping to force the halt.
//!
//! ## Run
//! ```bash
//! cargo run --example app --features logging
//! ```

use std::{
    sync::Arc,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use appvisor::{AppIdentity, Config, Event, EventKind, LogConfig, Service, Subscribe, Supervisor, TaskError};

struct Pool;

#[async_trait]
impl Service for Pool {
    fn name(&self) -> &str {
        "db-pool"
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(300)) => Ok(()),
            _ = ctx.cancelled() => Err(TaskError::Canceled),
        }
    }

    async fn stop(&self) -> Result<(), TaskError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(())
    }
}

struct Http;

#[async_trait]
impl Service for Http {
    fn name(&self) -> &str {
        "http"
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        if ctx.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), TaskError> {
        // Drain in-flight requests.
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(())
    }
}

struct ServiceCounter {
    started: AtomicU64,
    stopped: AtomicU64,
}

#[async_trait]
impl Subscribe for ServiceCounter {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::ServiceStarted => {
                self.started.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::ServiceStopped => {
                self.stopped.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "service-counter"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cfg = Config::for_app(AppIdentity::new("api").with_vendor("acme").with_domain("billing"));
    cfg.log = LogConfig {
        level: Some("debug".into()),
        ansi: true,
    };
    appvisor::logging::init(&cfg.log)?;

    let counter = Arc::new(ServiceCounter {
        started: AtomicU64::new(0),
        stopped: AtomicU64::new(0),
    });
    let subscriber: Arc<dyn Subscribe> = counter.clone();
    let sup = Supervisor::builder(cfg)
        .with_service(Arc::new(Pool))
        .with_service(Arc::new(Http))
        .with_subscribers(vec![subscriber])
        .build();

    let exit = sup.run_until_exit().await?;

    println!();
    println!("Lifecycle:");
    println!(" ├─► Exit:     {exit:?}");
    println!(" ├─► Started:  {}", counter.started.load(Ordering::Relaxed));
    println!(" └─► Stopped:  {}", counter.stopped.load(Ordering::Relaxed));

    std::process::exit(exit.code());
}
