//! Runner module initialization.
//!
//! Converts `TarunnerConfig.agent` into a `RunnerConfig`, builds the
//! [`Runner`] and schedules every loaded app.
//!
//! # Channel Wiring
//!
//! ```text
//! Runner --Vec<LogRecord>--> record_rx --> Forwarder
//! ```

use anyhow::Result;
use tokio::sync::mpsc;

use tarunner_conf::App;
use tarunner_core::config::TarunnerConfig;
use tarunner_core::record::LogRecord;
use tarunner_log_pipeline::{Runner, RunnerBuilder, RunnerConfig};

/// A runner with its apps scheduled, plus the receiving end of its record channel.
pub struct ScheduledRunner {
    /// The runner, not yet started.
    pub runner: Runner,
    /// Records produced by the runner.
    pub records: mpsc::Receiver<Vec<LogRecord>>,
    /// Number of inputs scheduled across all apps.
    pub scheduled: usize,
}

/// Build the runner and schedule `apps`.
///
/// # Errors
///
/// - Invalid `[agent]` section
/// - Runner build failure
pub fn init(config: &TarunnerConfig, apps: &[App]) -> Result<ScheduledRunner> {
    let runner_config = RunnerConfig::from_core(&config.agent)
        .map_err(|e| anyhow::anyhow!("invalid agent config: {}", e))?;

    let (mut runner, records) = RunnerBuilder::new()
        .config(runner_config)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build runner: {}", e))?;
    let records = records.ok_or_else(|| anyhow::anyhow!("runner built without a record channel"))?;

    let scheduled = runner.schedule_apps(apps);
    tracing::info!(apps = apps.len(), scheduled, "runner initialized");

    Ok(ScheduledRunner {
        runner,
        records,
        scheduled,
    })
}
