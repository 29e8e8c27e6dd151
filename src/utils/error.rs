use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Failed to extract {archive}: {message}")]
    Extraction { archive: PathBuf, message: String },

    #[error("Expected exactly 2 folders in {dir}, got {found}")]
    UnexpectedLayout { dir: PathBuf, found: usize },

    #[error("Could not tell the API folder apart: {matched} of {candidates:?} matched")]
    ClassificationAmbiguous {
        candidates: Vec<String>,
        matched: usize,
    },

    #[error("Dependency install failed in {dir}: {message}")]
    DependencyInstall { dir: PathBuf, message: String },

    #[error("Database reset failed: {message}")]
    DatabaseReset { message: String },

    #[error("Failed to write {path}: {source}")]
    EnvWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration failed in {dir}: {message}")]
    Migration { dir: PathBuf, message: String },

    #[error("Failed to launch service in {dir}: {message}")]
    Launch { dir: PathBuf, message: String },

    #[error("Failed to open editor on {dir}: {message}")]
    Editor { dir: PathBuf, message: String },

    #[error("Failed to delete {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl IntakeError {
    /// Whether this failure ends the run for the archive being processed.
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            IntakeError::Extraction { .. }
                | IntakeError::UnexpectedLayout { .. }
                | IntakeError::ClassificationAmbiguous { .. }
                | IntakeError::DependencyInstall { .. }
                | IntakeError::DatabaseReset { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            IntakeError::Extraction { .. } | IntakeError::Zip(_) => {
                "Check that the archive is a complete, valid ZIP file and drop it again"
            }
            IntakeError::UnexpectedLayout { .. } => {
                "The submission should contain exactly two project folders"
            }
            IntakeError::ClassificationAmbiguous { .. } => {
                "Rename the API folder or set [classify].override_name in the config"
            }
            IntakeError::DependencyInstall { .. } => {
                "Run the install command by hand in the folder to see the full output"
            }
            IntakeError::DatabaseReset { .. } => {
                "Make sure the database server is running and the [database] credentials are right"
            }
            IntakeError::EnvWrite { .. } | IntakeError::Cleanup { .. } | IntakeError::Io(_) => {
                "Check file permissions in the watched directory"
            }
            IntakeError::Migration { .. } => "Inspect the migration scripts of the submission",
            IntakeError::Launch { .. } | IntakeError::Editor { .. } => {
                "Check that the command in [commands] is installed and on PATH"
            }
            IntakeError::Watch(_) => "Check that the watch directory exists and is readable",
            IntakeError::Config { .. }
            | IntakeError::MissingConfig { .. }
            | IntakeError::InvalidConfigValue { .. } => "Fix the configuration file and restart",
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_policy() {
        let layout = IntakeError::UnexpectedLayout {
            dir: PathBuf::from("x"),
            found: 3,
        };
        assert!(layout.aborts_run());

        let reset = IntakeError::DatabaseReset {
            message: "connection refused".to_string(),
        };
        assert!(reset.aborts_run());

        let migration = IntakeError::Migration {
            dir: PathBuf::from("api"),
            message: "exit 1".to_string(),
        };
        assert!(!migration.aborts_run());

        let cleanup = IntakeError::Cleanup {
            path: PathBuf::from("a.zip"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!cleanup.aborts_run());
    }

    #[test]
    fn test_layout_message_names_count() {
        let err = IntakeError::UnexpectedLayout {
            dir: PathBuf::from("submission"),
            found: 0,
        };
        assert_eq!(
            err.to_string(),
            "Expected exactly 2 folders in submission, got 0"
        );
    }
}
