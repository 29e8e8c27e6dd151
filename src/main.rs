use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use submission_runner::utils::{logger, validation::Validate};
use submission_runner::{build_dispatcher, run_watch_loop, CliConfig, EnvironmentDocument};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting submission-runner");

    let config = cli
        .load_runner_config()
        .context("failed to load configuration")?;

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    tracing::debug!("Runner config: {:?}", config);

    if cli.print_env {
        println!("{}", EnvironmentDocument::from_config(&config).as_str());
        return Ok(());
    }

    let dispatcher = Arc::new(build_dispatcher(&config)?);

    if let Some(archive) = &cli.once {
        let report = dispatcher.process_when_stable(archive).await;
        if report.map(|r| r.aborted).unwrap_or(true) {
            std::process::exit(1);
        }
        return Ok(());
    }

    run_watch_loop(&config.watch, dispatcher)
        .await
        .with_context(|| format!("failed to watch {}", config.watch.dir.display()))?;

    Ok(())
}
