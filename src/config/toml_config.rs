use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub watch: WatchConfig,
    pub classify: ClassifyConfig,
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
    pub redis: RedisConfig,
    pub rabbitmq: RabbitMqConfig,
    pub aws: AwsConfig,
    pub token: TokenConfig,
    pub commands: CommandsConfig,
    pub env_file: EnvFileConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub dir: PathBuf,
    pub extension: String,
    pub poll_interval_ms: u64,
    pub stability_timeout_ms: u64,
    /// Process one archive at a time through the stages.
    pub serialize_runs: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            extension: "zip".to_string(),
            poll_interval_ms: 500,
            stability_timeout_ms: 3000,
            serialize_runs: true,
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stability_timeout(&self) -> Duration {
        Duration::from_millis(self.stability_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Folder name treated as the API folder when a submission uses a custom name.
    pub override_name: Option<String>,
    pub extra_tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: "postgres".to_string(),
            password: "dev".to_string(),
            database: "music_db".to_string(),
            port: 5432,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            user: "your@email.com".to_string(),
            password: "xxxx xxxx xxxx xxxx".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RabbitMqConfig {
    pub server: String,
}

impl Default for RabbitMqConfig {
    fn default() -> Self {
        Self {
            server: "amqp://localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            bucket: "xxxx".to_string(),
            access_key_id: "xxxx".to_string(),
            secret_access_key: "xxxx".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub access_key: String,
    pub refresh_key: String,
    pub age: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_key: "xxxx".to_string(),
            refresh_key: "xxxx".to_string(),
            age: 1800,
        }
    }
}

/// Argument vectors for the external tools, program first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub install: Vec<String>,
    pub migrate: Vec<String>,
    pub start: Vec<String>,
    pub editor: Vec<String>,
    pub db_client: Vec<String>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            install: argv(&["npm", "install"]),
            migrate: argv(&["npm", "run", "migrate", "up"]),
            start: argv(&["npm", "run", "start"]),
            editor: argv(&["code", "."]),
            db_client: argv(&["psql"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvFileConfig {
    pub name: String,
}

impl Default for EnvFileConfig {
    fn default() -> Self {
        Self {
            name: ".env".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub remove_archive: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            remove_archive: true,
        }
    }
}

impl RunnerConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| IntakeError::Config {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| IntakeError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` references with environment values (e.g. `${PGPASSWORD}`).
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| IntakeError::Config {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn env_file_name(&self) -> &str {
        &self.env_file.name
    }
}

impl Validate for RunnerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("watch.dir", &self.watch.dir.to_string_lossy())?;
        validation::validate_non_empty_string("watch.extension", &self.watch.extension)?;
        validation::validate_range("watch.poll_interval_ms", self.watch.poll_interval_ms, 1, u64::MAX)?;
        if self.watch.stability_timeout_ms < self.watch.poll_interval_ms {
            return Err(IntakeError::InvalidConfigValue {
                field: "watch.stability_timeout_ms".to_string(),
                value: self.watch.stability_timeout_ms.to_string(),
                reason: "Timeout must be at least one poll interval".to_string(),
            });
        }

        validation::validate_range("database.port", self.database.port, 1, 65535)?;
        validation::validate_non_empty_string("database.database", &self.database.database)?;
        validation::validate_url("rabbitmq.server", &self.rabbitmq.server, &["amqp", "amqps"])?;

        validation::validate_command("commands.install", &self.commands.install)?;
        validation::validate_command("commands.migrate", &self.commands.migrate)?;
        validation::validate_command("commands.start", &self.commands.start)?;
        validation::validate_command("commands.editor", &self.commands.editor)?;
        validation::validate_command("commands.db_client", &self.commands.db_client)?;

        validation::validate_path("env_file.name", &self.env_file.name)?;
        if self.env_file.name.contains('/') || self.env_file.name.contains('\\') {
            return Err(IntakeError::InvalidConfigValue {
                field: "env_file.name".to_string(),
                value: self.env_file.name.clone(),
                reason: "Must be a plain file name".to_string(),
            });
        }

        Ok(())
    }
}
