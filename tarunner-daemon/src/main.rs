use anyhow::Result;
use clap::Parser;

use tarunner_core::config::TarunnerConfig;
use tarunner_daemon::cli::DaemonCli;
use tarunner_daemon::forwarder::normalize_endpoint;
use tarunner_daemon::orchestrator::{self, Orchestrator};
use tarunner_daemon::{logging, modules};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = match &cli.config {
        Some(path) => TarunnerConfig::load(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?,
        None => {
            let mut config = TarunnerConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    // CLI 인자가 파일/환경변수보다 우선
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        base_dir = %cli.base_dir.display(),
        "tarunner-daemon starting"
    );

    if cli.validate || cli.print_plan {
        let endpoint = normalize_endpoint(&cli.endpoint)?;
        let apps = orchestrator::load_apps(&cli.base_dir).await?;
        let built = modules::runner::init(&config, &apps)?;

        if cli.print_plan {
            println!("{}", serde_json::to_string_pretty(built.runner.plans())?);
        } else {
            let inputs: usize = apps.iter().map(|app| app.inputs.len()).sum();
            println!(
                "configuration valid: {} apps, {} inputs, {} scheduled, endpoint {}",
                apps.len(),
                inputs,
                built.scheduled,
                endpoint
            );
        }
        return Ok(());
    }

    let mut orchestrator = Orchestrator::build(config, &cli.base_dir, &cli.endpoint).await?;
    orchestrator.run().await?;

    tracing::info!("tarunner-daemon shut down");
    Ok(())
}
