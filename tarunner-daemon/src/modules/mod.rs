//! Module registry.
//!
//! The runner and the forwarder are wrapped as [`ModuleHandle`]s that provide
//! uniform lifecycle management via the [`DynPipeline`] trait.
//!
//! The [`ModuleRegistry`] tracks registered modules and supports
//! ordered start/stop operations.

pub mod runner;

use tarunner_core::pipeline::{DynPipeline, HealthStatus};

/// A handle to a registered module.
pub struct ModuleHandle {
    /// Module name for logging and health reporting.
    pub name: String,
    /// The module's pipeline implementation (start/stop/health_check).
    pub pipeline: Box<dyn DynPipeline>,
}

impl ModuleHandle {
    /// Create a new module handle.
    pub fn new(name: impl Into<String>, pipeline: Box<dyn DynPipeline>) -> Self {
        Self {
            name: name.into(),
            pipeline,
        }
    }
}

/// Registry of daemon modules.
///
/// Modules are registered producers first. Both start and stop walk the
/// registry in that order, so a consumer is still running while the
/// producer in front of it winds down and can drain what is left.
pub struct ModuleRegistry {
    modules: Vec<ModuleHandle>,
    /// Number of modules started by the last `start_all`.
    started: usize,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            started: 0,
        }
    }

    /// Register a module.
    pub fn register(&mut self, handle: ModuleHandle) {
        self.modules.push(handle);
    }

    /// Start all modules in registration order.
    ///
    /// Returns an error on the first module that fails to start.
    /// Already-started modules are NOT rolled back; the caller should
    /// invoke `stop_all` if partial startup is unacceptable.
    pub async fn start_all(&mut self) -> anyhow::Result<()> {
        self.started = 0;
        for handle in &mut self.modules {
            tracing::info!(module = %handle.name, "starting module");
            handle
                .pipeline
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start module '{}': {}", handle.name, e))?;
            self.started += 1;
            tracing::info!(module = %handle.name, "module started");
        }
        Ok(())
    }

    /// Stop every module in registration order.
    ///
    /// Logs errors but continues stopping remaining modules.
    pub async fn stop_all(&mut self) -> anyhow::Result<()> {
        let mut errors = Vec::new();

        for handle in &mut self.modules {
            tracing::info!(module = %handle.name, "stopping module");
            if let Err(e) = handle.pipeline.stop().await {
                tracing::error!(module = %handle.name, error = %e, "failed to stop module");
                errors.push(format!("{}: {}", handle.name, e));
            } else {
                tracing::info!(module = %handle.name, "module stopped");
            }
        }
        self.started = 0;

        if !errors.is_empty() {
            return Err(anyhow::anyhow!(
                "errors stopping modules: {}",
                errors.join("; ")
            ));
        }
        Ok(())
    }

    /// Health status of every module, in registration order.
    pub async fn health_statuses(&self) -> Vec<(String, HealthStatus)> {
        let mut statuses = Vec::with_capacity(self.modules.len());
        for handle in &self.modules {
            statuses.push((handle.name.clone(), handle.pipeline.health_check().await));
        }
        statuses
    }

    /// Number of registered modules.
    pub fn count(&self) -> usize {
        self.modules.len()
    }

    /// Number of modules started by the last `start_all`.
    pub fn started_count(&self) -> usize {
        self.started
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Worst status among `statuses`: Unhealthy > Degraded > Healthy.
///
/// Reasons are prefixed with the module name and joined with `"; "`.
pub fn aggregate_status(statuses: &[(String, HealthStatus)]) -> HealthStatus {
    let mut degraded = Vec::new();
    let mut unhealthy = Vec::new();

    for (name, status) in statuses {
        match status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => degraded.push(format!("{name}: {reason}")),
            HealthStatus::Unhealthy(reason) => unhealthy.push(format!("{name}: {reason}")),
        }
    }

    if !unhealthy.is_empty() {
        unhealthy.extend(degraded);
        HealthStatus::Unhealthy(unhealthy.join("; "))
    } else if !degraded.is_empty() {
        HealthStatus::Degraded(degraded.join("; "))
    } else {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tarunner_core::error::{PipelineError, TarunnerError};
    use tarunner_core::pipeline::Pipeline;

    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_start: bool,
    }

    impl Pipeline for Recorder {
        async fn start(&mut self) -> Result<(), TarunnerError> {
            if self.fail_start {
                return Err(PipelineError::InitFailed("boom".to_owned()).into());
            }
            self.log.lock().unwrap().push(format!("start:{}", self.name));
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), TarunnerError> {
            self.log.lock().unwrap().push(format!("stop:{}", self.name));
            Ok(())
        }

        async fn health_check(&self) -> HealthStatus {
            HealthStatus::Healthy
        }
    }

    fn registry(log: &Arc<Mutex<Vec<String>>>, fail_second: bool) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for (name, fail_start) in [("runner", false), ("forwarder", fail_second)] {
            registry.register(ModuleHandle::new(
                name,
                Box::new(Recorder {
                    name,
                    log: Arc::clone(log),
                    fail_start,
                }),
            ));
        }
        registry
    }

    #[tokio::test]
    async fn start_and_stop_follow_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = registry(&log, false);
        registry.start_all().await.unwrap();
        assert_eq!(registry.started_count(), 2);
        registry.stop_all().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start:runner", "start:forwarder", "stop:runner", "stop:forwarder"]
        );
    }

    #[tokio::test]
    async fn start_failure_names_the_module() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = registry(&log, true);
        let err = registry.start_all().await.unwrap_err();
        assert!(err.to_string().contains("'forwarder'"));
        assert_eq!(registry.started_count(), 1);
    }

    #[test]
    fn aggregate_picks_worst() {
        let statuses = vec![
            ("runner".to_owned(), HealthStatus::Degraded("no active jobs".to_owned())),
            ("forwarder".to_owned(), HealthStatus::Healthy),
        ];
        assert_eq!(
            aggregate_status(&statuses),
            HealthStatus::Degraded("runner: no active jobs".to_owned())
        );

        let statuses = vec![
            ("runner".to_owned(), HealthStatus::Degraded("slow".to_owned())),
            ("forwarder".to_owned(), HealthStatus::Unhealthy("stopped".to_owned())),
        ];
        assert_eq!(
            aggregate_status(&statuses),
            HealthStatus::Unhealthy("forwarder: stopped; runner: slow".to_owned())
        );

        assert!(aggregate_status(&[]).is_healthy());
    }
}
