use crate::config::RunnerConfig;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Renamed,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// True for created/renamed files carrying the given extension (case-insensitive).
    pub fn is_archive(&self, extension: &str) -> bool {
        self.kind != WatchEventKind::Other
            && self
                .path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
    }
}

/// An archive waiting for its size to settle.
#[derive(Debug, Clone)]
pub struct PendingArchive {
    pub path: PathBuf,
    /// `None` until the first successful size read.
    pub last_observed_size: Option<u64>,
    pub poll_count: u32,
}

impl PendingArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_observed_size: None,
            poll_count: 0,
        }
    }

    /// Records a size sample and reports whether it repeats the previous one.
    pub fn observe(&mut self, size: u64) -> bool {
        let settled = self.last_observed_size == Some(size);
        self.last_observed_size = Some(size);
        settled
    }
}

/// Which of the two folders plays the API role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub service_a: String,
    pub service_b: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root_dir: PathBuf,
    pub service_a_path: PathBuf,
    pub service_b_path: PathBuf,
}

impl ProjectLayout {
    pub fn new(root_dir: impl Into<PathBuf>, roles: &RoleAssignment) -> Self {
        let root_dir = root_dir.into();
        Self {
            service_a_path: root_dir.join(&roles.service_a),
            service_b_path: root_dir.join(&roles.service_b),
            root_dir,
        }
    }
}

/// `KEY=value` document written into both service folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentDocument {
    content: String,
}

impl EnvironmentDocument {
    pub fn from_config(config: &RunnerConfig) -> Self {
        let groups: [Vec<(&str, String)>; 6] = [
            vec![
                ("HOST", config.app.host.clone()),
                ("PORT", config.app.port.to_string()),
            ],
            vec![
                ("PGHOST", config.database.host.clone()),
                ("PGUSER", config.database.user.clone()),
                ("PGPASSWORD", config.database.password.clone()),
                ("PGDATABASE", config.database.database.clone()),
                ("PGPORT", config.database.port.to_string()),
            ],
            vec![
                ("ACCESS_TOKEN_KEY", config.token.access_key.clone()),
                ("REFRESH_TOKEN_KEY", config.token.refresh_key.clone()),
                ("ACCESS_TOKEN_AGE", config.token.age.to_string()),
            ],
            vec![
                ("RABBITMQ_SERVER", config.rabbitmq.server.clone()),
                ("REDIS_SERVER", config.redis.host.clone()),
            ],
            vec![
                ("AWS_BUCKET_NAME", config.aws.bucket.clone()),
                ("AWS_ACCESS_KEY_ID", config.aws.access_key_id.clone()),
                ("AWS_SECRET_ACCESS_KEY", config.aws.secret_access_key.clone()),
            ],
            vec![
                ("SMTP_HOST", config.smtp.host.clone()),
                ("SMTP_PORT", config.smtp.port.to_string()),
                ("SMTP_USER", config.smtp.user.clone()),
                ("SMTP_PASSWORD", config.smtp.password.clone()),
            ],
        ];

        let content = groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Self { content }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InstallServiceA,
    ResetDatabase,
    WriteEnvServiceA,
    WriteEnvServiceB,
    Migrate,
    InstallServiceB,
    LaunchServiceA,
    LaunchServiceB,
    OpenEditor,
    RemoveArchive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::InstallServiceA => "install (service A)",
            Stage::ResetDatabase => "reset database",
            Stage::WriteEnvServiceA => "write env (service A)",
            Stage::WriteEnvServiceB => "write env (service B)",
            Stage::Migrate => "migrate",
            Stage::InstallServiceB => "install (service B)",
            Stage::LaunchServiceA => "launch (service A)",
            Stage::LaunchServiceB => "launch (service B)",
            Stage::OpenEditor => "open editor",
            Stage::RemoveArchive => "remove archive",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub fatal: bool,
}

impl StageResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, StageOutcome::Failed(_))
    }
}

/// Everything that happened to one archive.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub archive: PathBuf,
    pub started_at: DateTime<Local>,
    pub stages: Vec<StageResult>,
    pub aborted: bool,
}

impl RunReport {
    pub fn new(archive: &Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            started_at: Local::now(),
            stages: Vec::new(),
            aborted: false,
        }
    }

    pub fn push(&mut self, result: StageResult) {
        self.stages.push(result);
    }

    pub fn attempted(&self, stage: Stage) -> bool {
        self.stages.iter().any(|r| r.stage == stage)
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageResult> {
        self.stages.iter().filter(|r| r.is_failure())
    }

    pub fn summary(&self) -> String {
        let failed: Vec<String> = self.failures().map(|r| r.stage.to_string()).collect();
        let status = if self.aborted { "aborted" } else { "done" };
        if failed.is_empty() {
            format!("{} stages, {}", self.stages.len(), status)
        } else {
            format!(
                "{} stages, {}, failed: {}",
                self.stages.len(),
                status,
                failed.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_filter() {
        assert!(WatchEvent::new(WatchEventKind::Renamed, "/w/submission.zip").is_archive("zip"));
        assert!(WatchEvent::new(WatchEventKind::Created, "/w/SUBMISSION.ZIP").is_archive("zip"));
        assert!(!WatchEvent::new(WatchEventKind::Other, "/w/submission.zip").is_archive("zip"));
        assert!(!WatchEvent::new(WatchEventKind::Created, "/w/submission.zip.part").is_archive("zip"));
        assert!(!WatchEvent::new(WatchEventKind::Created, "/w/submission").is_archive("zip"));
    }

    #[test]
    fn test_pending_archive_first_sample_never_settles() {
        let mut pending = PendingArchive::new("a.zip");
        assert!(!pending.observe(0));
        assert!(pending.observe(0));
        assert!(!pending.observe(5));
    }

    #[test]
    fn test_environment_document_layout() {
        let doc = EnvironmentDocument::from_config(&RunnerConfig::default());
        let text = doc.as_str();

        assert!(text.starts_with("HOST=localhost\nPORT=5000\n\nPGHOST=localhost"));
        assert!(text.contains("PGPASSWORD=dev\nPGDATABASE=music_db\nPGPORT=5432"));
        assert!(text.contains("ACCESS_TOKEN_AGE=1800"));
        assert!(text.contains("RABBITMQ_SERVER=amqp://localhost\nREDIS_SERVER=localhost"));
        assert!(text.ends_with("SMTP_PASSWORD=xxxx xxxx xxxx xxxx"));
        assert_eq!(text.lines().filter(|l| l.is_empty()).count(), 5);
    }

    #[test]
    fn test_report_summary() {
        let mut report = RunReport::new(Path::new("a.zip"));
        report.push(StageResult {
            stage: Stage::InstallServiceA,
            outcome: StageOutcome::Success,
            fatal: true,
        });
        report.push(StageResult {
            stage: Stage::Migrate,
            outcome: StageOutcome::Failed("exit 1".to_string()),
            fatal: false,
        });

        assert!(report.attempted(Stage::Migrate));
        assert!(!report.attempted(Stage::OpenEditor));
        assert_eq!(report.summary(), "2 stages, done, failed: migrate");
    }
}
