use crate::domain::model::{
    EnvironmentDocument, ProjectLayout, RunReport, Stage, StageOutcome, StageResult,
};
use crate::domain::ports::Toolchain;
use crate::utils::error::{IntakeError, Result};
use std::path::Path;

/// Runs the fixed stage sequence for one classified project.
pub struct StageOrchestrator<T: Toolchain> {
    toolchain: T,
    env: EnvironmentDocument,
    env_file_name: String,
    remove_archive: bool,
}

impl<T: Toolchain> StageOrchestrator<T> {
    pub fn new(toolchain: T, env: EnvironmentDocument, env_file_name: impl Into<String>) -> Self {
        Self {
            toolchain,
            env,
            env_file_name: env_file_name.into(),
            remove_archive: true,
        }
    }

    pub fn with_archive_removal(mut self, enabled: bool) -> Self {
        self.remove_archive = enabled;
        self
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    pub async fn run(&self, layout: &ProjectLayout, archive: &Path) -> RunReport {
        let mut report = RunReport::new(archive);
        let service_a = layout.service_a_path.as_path();
        let service_b = layout.service_b_path.as_path();

        tracing::info!("📦 Installing dependencies in {}", service_a.display());
        let installed = self.toolchain.install_dependencies(service_a).await;
        if !record(&mut report, Stage::InstallServiceA, true, installed) {
            report.aborted = true;
            return report;
        }

        tracing::info!("🧨 Dropping all tables");
        let reset = self.toolchain.reset_database().await;
        if !record(&mut report, Stage::ResetDatabase, true, reset) {
            report.aborted = true;
            return report;
        }

        let written = self.write_env_file(service_a).await;
        record(&mut report, Stage::WriteEnvServiceA, false, written);
        let written = self.write_env_file(service_b).await;
        record(&mut report, Stage::WriteEnvServiceB, false, written);

        tracing::info!("🚀 Running migration in {}", service_a.display());
        let migrated = self.toolchain.run_migration(service_a).await;
        record(&mut report, Stage::Migrate, false, migrated);

        tracing::info!("📦 Installing dependencies in {}", service_b.display());
        let installed = self.toolchain.install_dependencies(service_b).await;
        record(&mut report, Stage::InstallServiceB, false, installed);

        tracing::info!("🚀 Launching {}", service_a.display());
        let launched = self.toolchain.launch_service(service_a);
        record(&mut report, Stage::LaunchServiceA, false, launched);
        tracing::info!("🚀 Launching {}", service_b.display());
        let launched = self.toolchain.launch_service(service_b);
        record(&mut report, Stage::LaunchServiceB, false, launched);

        tracing::info!("🧠 Opening {} in editor", layout.root_dir.display());
        let opened = self.toolchain.open_editor(&layout.root_dir).await;
        record(&mut report, Stage::OpenEditor, false, opened);

        if self.remove_archive {
            let removed = tokio::fs::remove_file(archive)
                .await
                .map_err(|source| IntakeError::Cleanup {
                    path: archive.to_path_buf(),
                    source,
                });
            if record(&mut report, Stage::RemoveArchive, false, removed) {
                tracing::info!("🗑️ Deleted archive {}", archive.display());
            }
        } else {
            report.push(StageResult {
                stage: Stage::RemoveArchive,
                outcome: StageOutcome::Skipped,
                fatal: false,
            });
        }

        report
    }

    async fn write_env_file(&self, dir: &Path) -> Result<()> {
        let path = dir.join(&self.env_file_name);
        tokio::fs::write(&path, self.env.as_str())
            .await
            .map_err(|source| IntakeError::EnvWrite {
                path: path.clone(),
                source,
            })?;
        tracing::info!("📝 Env file written to {}", path.display());
        Ok(())
    }
}

/// Appends the stage outcome to the report and logs failures; returns success.
fn record(report: &mut RunReport, stage: Stage, fatal: bool, result: Result<()>) -> bool {
    let outcome = match result {
        Ok(()) => {
            tracing::debug!("✅ Stage {} succeeded", stage);
            StageOutcome::Success
        }
        Err(e) if fatal => {
            tracing::error!("⛔ Stage {} failed, stopping this run: {}", stage, e);
            tracing::error!("💡 {}", e.recovery_suggestion());
            StageOutcome::Failed(e.to_string())
        }
        Err(e) => {
            tracing::warn!("⚠️ Stage {} failed, continuing: {}", stage, e);
            StageOutcome::Failed(e.to_string())
        }
    };

    let succeeded = outcome == StageOutcome::Success;
    report.push(StageResult {
        stage,
        outcome,
        fatal,
    });
    succeeded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeToolchain {
        calls: Mutex<Vec<String>>,
        fail_install_in: Option<PathBuf>,
        fail_reset: bool,
        fail_migration: bool,
    }

    impl FakeToolchain {
        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn leaf(dir: &Path) -> String {
        dir.file_name().unwrap().to_string_lossy().into_owned()
    }

    #[async_trait]
    impl Toolchain for FakeToolchain {
        async fn install_dependencies(&self, dir: &Path) -> Result<()> {
            self.log(format!("install {}", leaf(dir)));
            if self.fail_install_in.as_deref() == Some(dir) {
                return Err(IntakeError::DependencyInstall {
                    dir: dir.to_path_buf(),
                    message: "exit status 1".to_string(),
                });
            }
            Ok(())
        }

        async fn reset_database(&self) -> Result<()> {
            self.log("reset".to_string());
            if self.fail_reset {
                return Err(IntakeError::DatabaseReset {
                    message: "connection refused".to_string(),
                });
            }
            Ok(())
        }

        async fn run_migration(&self, dir: &Path) -> Result<()> {
            self.log(format!("migrate {}", leaf(dir)));
            if self.fail_migration {
                return Err(IntakeError::Migration {
                    dir: dir.to_path_buf(),
                    message: "exit status 1".to_string(),
                });
            }
            Ok(())
        }

        fn launch_service(&self, dir: &Path) -> Result<()> {
            self.log(format!("launch {}", leaf(dir)));
            Ok(())
        }

        async fn open_editor(&self, dir: &Path) -> Result<()> {
            self.log(format!("editor {}", leaf(dir)));
            Ok(())
        }
    }

    struct Fixture {
        _tmp: TempDir,
        layout: ProjectLayout,
        archive: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("submission");
        std::fs::create_dir_all(root.join("api")).unwrap();
        std::fs::create_dir_all(root.join("consumer")).unwrap();
        let archive = tmp.path().join("submission.zip");
        std::fs::write(&archive, b"PK").unwrap();

        let layout = ProjectLayout {
            service_a_path: root.join("api"),
            service_b_path: root.join("consumer"),
            root_dir: root,
        };
        Fixture {
            _tmp: tmp,
            layout,
            archive,
        }
    }

    fn orchestrator(toolchain: FakeToolchain) -> StageOrchestrator<FakeToolchain> {
        let env = EnvironmentDocument::from_config(&RunnerConfig::default());
        StageOrchestrator::new(toolchain, env, ".env")
    }

    #[tokio::test]
    async fn test_all_stages_run_in_order() {
        let fx = fixture();
        let orch = orchestrator(FakeToolchain::default());

        let report = orch.run(&fx.layout, &fx.archive).await;

        assert!(!report.aborted);
        assert_eq!(report.stages.len(), 10);
        assert_eq!(report.failures().count(), 0);
        assert_eq!(
            orch.toolchain().calls(),
            vec![
                "install api",
                "reset",
                "migrate api",
                "install consumer",
                "launch api",
                "launch consumer",
                "editor submission",
            ]
        );
        assert!(!fx.archive.exists());

        let env_a = std::fs::read_to_string(fx.layout.service_a_path.join(".env")).unwrap();
        let env_b = std::fs::read_to_string(fx.layout.service_b_path.join(".env")).unwrap();
        assert_eq!(env_a, env_b);
    }

    #[tokio::test]
    async fn test_install_failure_in_service_a_skips_database_reset() {
        let fx = fixture();
        let orch = orchestrator(FakeToolchain {
            fail_install_in: Some(fx.layout.service_a_path.clone()),
            ..Default::default()
        });

        let report = orch.run(&fx.layout, &fx.archive).await;

        assert!(report.aborted);
        assert_eq!(orch.toolchain().calls(), vec!["install api"]);
        assert!(!report.attempted(Stage::ResetDatabase));
        assert!(fx.archive.exists());
    }

    #[tokio::test]
    async fn test_reset_failure_aborts_before_env_files() {
        let fx = fixture();
        let orch = orchestrator(FakeToolchain {
            fail_reset: true,
            ..Default::default()
        });

        let report = orch.run(&fx.layout, &fx.archive).await;

        assert!(report.aborted);
        assert_eq!(report.stages.len(), 2);
        assert!(!fx.layout.service_a_path.join(".env").exists());
    }

    #[tokio::test]
    async fn test_env_write_failure_for_service_b_is_not_fatal() {
        let fx = fixture();
        // A directory in the way makes the write fail.
        std::fs::create_dir(fx.layout.service_b_path.join(".env")).unwrap();
        let orch = orchestrator(FakeToolchain::default());

        let report = orch.run(&fx.layout, &fx.archive).await;

        assert!(!report.aborted);
        assert_eq!(report.outcome(Stage::WriteEnvServiceA), Some(&StageOutcome::Success));
        assert!(matches!(
            report.outcome(Stage::WriteEnvServiceB),
            Some(StageOutcome::Failed(_))
        ));
        let calls = orch.toolchain().calls();
        assert!(calls.contains(&"migrate api".to_string()));
        assert!(calls.contains(&"install consumer".to_string()));
        assert!(calls.contains(&"launch consumer".to_string()));
    }

    #[tokio::test]
    async fn test_later_failures_still_reach_cleanup() {
        let fx = fixture();
        let orch = orchestrator(FakeToolchain {
            fail_migration: true,
            fail_install_in: Some(fx.layout.service_b_path.clone()),
            ..Default::default()
        });

        let report = orch.run(&fx.layout, &fx.archive).await;

        assert!(!report.aborted);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.outcome(Stage::RemoveArchive), Some(&StageOutcome::Success));
        assert!(!fx.archive.exists());
    }

    #[tokio::test]
    async fn test_archive_kept_when_removal_disabled() {
        let fx = fixture();
        let orch = orchestrator(FakeToolchain::default()).with_archive_removal(false);

        let report = orch.run(&fx.layout, &fx.archive).await;

        assert_eq!(report.outcome(Stage::RemoveArchive), Some(&StageOutcome::Skipped));
        assert!(fx.archive.exists());
    }

    #[tokio::test]
    async fn test_missing_archive_is_a_cleanup_failure() {
        let fx = fixture();
        std::fs::remove_file(&fx.archive).unwrap();
        let orch = orchestrator(FakeToolchain::default());

        let report = orch.run(&fx.layout, &fx.archive).await;

        assert!(!report.aborted);
        assert!(matches!(
            report.outcome(Stage::RemoveArchive),
            Some(StageOutcome::Failed(_))
        ));
    }
}
