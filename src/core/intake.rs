use crate::core::layout::{classify_roles, resolve_project_root, RoleMatcher};
use crate::core::stages::StageOrchestrator;
use crate::domain::model::{ProjectLayout, RunReport};
use crate::domain::ports::{ArchiveExtractor, Toolchain};
use crate::utils::error::{IntakeError, Result};
use std::path::{Path, PathBuf};

/// Extract, locate the two projects, then hand them to the stage orchestrator.
pub struct IntakePipeline<E: ArchiveExtractor, T: Toolchain> {
    extractor: E,
    matcher: RoleMatcher,
    orchestrator: StageOrchestrator<T>,
}

impl<E: ArchiveExtractor, T: Toolchain> IntakePipeline<E, T> {
    pub fn new(extractor: E, matcher: RoleMatcher, orchestrator: StageOrchestrator<T>) -> Self {
        Self {
            extractor,
            matcher,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &StageOrchestrator<T> {
        &self.orchestrator
    }

    /// `<dir of archive>/<archive stem>`
    pub fn extraction_dir(archive: &Path) -> Result<PathBuf> {
        let stem = archive.file_stem().ok_or_else(|| IntakeError::Extraction {
            archive: archive.to_path_buf(),
            message: "archive path has no file name".to_string(),
        })?;
        let parent = archive.parent().unwrap_or_else(|| Path::new("."));
        Ok(parent.join(stem))
    }

    /// Extracts and classifies without running any stage.
    pub async fn prepare(&self, archive: &Path) -> Result<ProjectLayout> {
        let dest = Self::extraction_dir(archive)?;
        self.extractor.extract(archive, &dest).await?;
        tracing::info!("✅ Extracted {} into {}", archive.display(), dest.display());

        let resolved = resolve_project_root(&dest).await?;
        let [first, second] = &resolved.folders;
        let roles = classify_roles([first.as_str(), second.as_str()], &self.matcher)?;
        tracing::info!(
            "🔎 Service A: {}, service B: {}",
            roles.service_a,
            roles.service_b
        );

        Ok(ProjectLayout::new(resolved.root, &roles))
    }

    pub async fn process(&self, archive: &Path) -> Result<RunReport> {
        let layout = self.prepare(archive).await?;
        Ok(self.orchestrator.run(&layout, archive).await)
    }

    /// Like [`process`](Self::process), but reports the outcome through the log only.
    pub async fn process_logged(&self, archive: &Path) -> Option<RunReport> {
        match self.process(archive).await {
            Ok(report) => {
                if report.aborted {
                    tracing::error!("❌ {}: {}", archive.display(), report.summary());
                } else {
                    tracing::info!("✅ DONE {}: {}", archive.display(), report.summary());
                }
                if let Ok(json) = serde_json::to_string(&report) {
                    tracing::debug!("Run report: {}", json);
                }
                Some(report)
            }
            Err(e) => {
                tracing::error!("⛔ Skipping {}: {}", archive.display(), e);
                tracing::error!("💡 {}", e.recovery_suggestion());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_dir_is_named_after_archive() {
        type Pipeline = IntakePipeline<crate::adapters::ZipExtractor, crate::adapters::ShellToolchain>;

        let dest = Pipeline::extraction_dir(Path::new("/inbox/submission.zip")).unwrap();
        assert_eq!(dest, PathBuf::from("/inbox/submission"));

        let dest = Pipeline::extraction_dir(Path::new("a.b.zip")).unwrap();
        assert_eq!(dest, PathBuf::from("a.b"));

        assert!(Pipeline::extraction_dir(Path::new("/")).is_err());
    }
}
