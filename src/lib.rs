pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::RunnerConfig;

pub use adapters::{FsSizeProbe, ShellToolchain, ZipExtractor};
pub use crate::core::{
    intake::IntakePipeline,
    layout::RoleMatcher,
    stability::StabilityDetector,
    stages::StageOrchestrator,
    watch::{run_watch_loop, ArchiveDispatcher},
};
pub use domain::model::EnvironmentDocument;
pub use utils::error::{IntakeError, Result};

/// Wires the default adapters into a dispatcher for `config`.
pub fn build_dispatcher(
    config: &RunnerConfig,
) -> Result<ArchiveDispatcher<FsSizeProbe, ZipExtractor, ShellToolchain>> {
    let toolchain = ShellToolchain::new(config.commands.clone(), config.database.clone());
    let orchestrator = StageOrchestrator::new(
        toolchain,
        EnvironmentDocument::from_config(config),
        config.env_file_name(),
    )
    .with_archive_removal(config.cleanup.remove_archive);
    let pipeline = IntakePipeline::new(
        ZipExtractor,
        RoleMatcher::new(&config.classify)?,
        orchestrator,
    );
    let detector = StabilityDetector::new(
        FsSizeProbe,
        config.watch.poll_interval(),
        config.watch.stability_timeout(),
    );

    Ok(ArchiveDispatcher::new(detector, pipeline, &config.watch))
}
