//! External commands run through `tokio::process`.
//!
//! Every command is an argv list from `[commands]`; nothing goes through a
//! shell, so paths with spaces need no quoting.

use crate::config::toml_config::{CommandsConfig, DatabaseConfig};
use crate::domain::ports::Toolchain;
use crate::utils::error::{IntakeError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Drops every table of the current schema.
pub const DROP_ALL_TABLES_SQL: &str = r#"
DO $$ DECLARE
    r RECORD;
BEGIN
    FOR r IN (SELECT tablename FROM pg_tables WHERE schemaname = current_schema()) LOOP
        EXECUTE 'DROP TABLE IF EXISTS ' || quote_ident(r.tablename) || ' CASCADE';
    END LOOP;
END $$;
"#;

#[derive(Debug, Clone)]
pub struct ShellToolchain {
    commands: CommandsConfig,
    database: DatabaseConfig,
}

impl ShellToolchain {
    pub fn new(commands: CommandsConfig, database: DatabaseConfig) -> Self {
        Self { commands, database }
    }

    fn command(argv: &[String]) -> std::result::Result<Command, String> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| "empty command".to_string())?;
        let mut command = Command::new(program);
        command.args(args);
        Ok(command)
    }

    /// Runs `argv` in `dir` to completion, returning stdout on success.
    async fn run_in(argv: &[String], dir: &Path) -> std::result::Result<String, String> {
        let mut command = Self::command(argv)?;
        tracing::debug!("Running {:?} in {}", argv, dir.display());

        let output = command
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spawn_error(argv, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{} exited with {}: {}", argv[0], output.status, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn db_client_command(&self) -> std::result::Result<Command, String> {
        let db = &self.database;
        let mut command = Self::command(&self.commands.db_client)?;
        command
            .arg("-h")
            .arg(&db.host)
            .arg("-p")
            .arg(db.port.to_string())
            .arg("-U")
            .arg(&db.user)
            .arg("-d")
            .arg(&db.database)
            .arg("-v")
            .arg("ON_ERROR_STOP=1")
            .env("PGPASSWORD", &db.password)
            // Keep NOTICE chatter (e.g. cascades) off stderr.
            .env("PGOPTIONS", "-c client_min_messages=warning");
        Ok(command)
    }

    async fn drop_all_tables(&self) -> std::result::Result<(), String> {
        let mut child = self
            .db_client_command()?
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.commands.db_client, e))?;

        let mut sent = Ok(());
        if let Some(mut stdin) = child.stdin.take() {
            sent = stdin.write_all(DROP_ALL_TABLES_SQL.as_bytes()).await;
            // Closing stdin ends the session.
            drop(stdin);
        }

        // A client that quits early breaks the pipe; its stderr says why.
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| format!("failed to wait for database client: {}", e))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();

        if let Err(e) = sent {
            return Err(if stderr.is_empty() {
                format!("failed to send script: {}", e)
            } else {
                format!("failed to send script: {}: {}", e, stderr)
            });
        }
        if !output.status.success() {
            return Err(format!("exited with {}: {}", output.status, stderr));
        }
        if !stderr.is_empty() {
            return Err(stderr.to_string());
        }
        Ok(())
    }
}

fn spawn_error(argv: &[String], e: std::io::Error) -> String {
    let program = argv.first().map(String::as_str).unwrap_or("<empty>");
    if e.kind() == std::io::ErrorKind::NotFound {
        format!("command not found: {}", program)
    } else {
        format!("failed to start {}: {}", program, e)
    }
}

#[async_trait]
impl Toolchain for ShellToolchain {
    async fn install_dependencies(&self, dir: &Path) -> Result<()> {
        Self::run_in(&self.commands.install, dir)
            .await
            .map(|_| ())
            .map_err(|message| IntakeError::DependencyInstall {
                dir: dir.to_path_buf(),
                message,
            })
    }

    async fn reset_database(&self) -> Result<()> {
        self.drop_all_tables()
            .await
            .map_err(|message| IntakeError::DatabaseReset { message })
    }

    async fn run_migration(&self, dir: &Path) -> Result<()> {
        Self::run_in(&self.commands.migrate, dir)
            .await
            .map(|_| ())
            .map_err(|message| IntakeError::Migration {
                dir: dir.to_path_buf(),
                message,
            })
    }

    fn launch_service(&self, dir: &Path) -> Result<()> {
        let launch_error = |message: String| IntakeError::Launch {
            dir: dir.to_path_buf(),
            message,
        };

        let mut command = Self::command(&self.commands.start).map_err(launch_error)?;
        command
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);
        // Own process group, so a Ctrl-C on the watcher leaves the service running.
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| launch_error(spawn_error(&self.commands.start, e)))?;

        tracing::info!(
            "🚀 Launched {:?} in {} (pid {})",
            self.commands.start,
            dir.display(),
            child.id().map(|id| id.to_string()).unwrap_or_else(|| "?".to_string())
        );
        // Dropping the handle detaches the service from this run.
        drop(child);
        Ok(())
    }

    async fn open_editor(&self, dir: &Path) -> Result<()> {
        Self::run_in(&self.commands.editor, dir)
            .await
            .map(|_| ())
            .map_err(|message| IntakeError::Editor {
                dir: dir.to_path_buf(),
                message,
            })
    }
}
