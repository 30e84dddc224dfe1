//! Orchestration -- app loading, module wiring and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `tarunner-daemon`.
//! It loads the app directories, builds the runner and the forwarder,
//! starts them, waits for a shutdown signal and stops them in order.
//!
//! # Startup Order
//!
//! 1. Runner (produces records)
//! 2. Forwarder (consumes records)
//!
//! # Shutdown Order (same as startup - producer first)
//!
//! 1. Runner (cancel jobs, SIGTERM children, wait for drains)
//! 2. Forwarder (deliver what is still queued, then exit)

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use tarunner_conf::{App, AppLoader};
use tarunner_core::config::TarunnerConfig;
use tarunner_core::pipeline::HealthStatus;

use crate::forwarder::Forwarder;
use crate::metrics_server;
use crate::modules::{self, ModuleHandle, ModuleRegistry, aggregate_status};

/// Interval between health log lines while running.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Load every app under `base_dir`.
pub async fn load_apps(base_dir: &Path) -> Result<Vec<App>> {
    let apps = AppLoader::load_apps(base_dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load apps from {}: {}", base_dir.display(), e))?;
    if apps.is_empty() {
        tracing::warn!(base_dir = %base_dir.display(), "no app directories found");
    }
    Ok(apps)
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    config: TarunnerConfig,
    modules: ModuleRegistry,
    scheduled: usize,
    start_time: Instant,
}

impl Orchestrator {
    /// Build from an already-loaded configuration.
    ///
    /// This performs the following steps:
    /// 1. Validate the configuration
    /// 2. Install the metrics recorder when enabled
    /// 3. Load the apps under `base_dir`
    /// 4. Build and schedule the runner, then the forwarder
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - Any app fails to load (missing inputs.conf, malformed stanza)
    /// - The endpoint is malformed
    pub async fn build(config: TarunnerConfig, base_dir: &Path, endpoint: &str) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let apps = load_apps(base_dir).await?;
        let built = modules::runner::init(&config, &apps)?;
        let forwarder = Forwarder::new(endpoint, built.records)?;

        let mut registry = ModuleRegistry::new();
        registry.register(ModuleHandle::new("runner", Box::new(built.runner)));
        registry.register(ModuleHandle::new("forwarder", Box::new(forwarder)));

        tracing::info!(
            modules = registry.count(),
            scheduled = built.scheduled,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            modules: registry,
            scheduled: built.scheduled,
            start_time: Instant::now(),
        })
    }

    /// Number of inputs scheduled across all apps.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled
    }

    /// Loaded configuration.
    pub fn config(&self) -> &TarunnerConfig {
        &self.config
    }

    /// Run until SIGTERM or SIGINT.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Start all modules and run until `shutdown` resolves.
    ///
    /// Returns immediately, without starting anything, when no input is
    /// scheduled.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
    {
        if self.scheduled == 0 {
            tracing::info!("nothing scheduled, exiting");
            return Ok(());
        }

        if let Err(e) = self.modules.start_all().await {
            tracing::warn!("startup failed, stopping already-started modules");
            if let Err(stop_err) = self.modules.stop_all().await {
                tracing::error!(
                    startup_error = %e,
                    rollback_error = %stop_err,
                    "rollback also failed during startup failure cleanup"
                );
            }
            return Err(e);
        }

        tracing::info!(inputs = self.scheduled, "tarunner running");

        let mut health_tick = tokio::time::interval(HEALTH_LOG_INTERVAL);
        health_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        health_tick.tick().await;

        tokio::pin!(shutdown);
        let signal = loop {
            tokio::select! {
                signal = &mut shutdown => break signal?,
                _ = health_tick.tick() => self.log_health().await,
            }
        };
        tracing::info!(signal, "shutdown signal received");

        self.modules.stop_all().await?;
        tracing::info!(uptime_secs = self.start_time.elapsed().as_secs(), "tarunner stopped");
        Ok(())
    }

    /// Aggregated health of all modules.
    pub async fn health(&self) -> HealthStatus {
        aggregate_status(&self.modules.health_statuses().await)
    }

    async fn log_health(&self) {
        match self.health().await {
            HealthStatus::Healthy => tracing::debug!("all modules healthy"),
            status => tracing::warn!(status = %status, "module health degraded"),
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
