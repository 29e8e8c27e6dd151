use crate::config::RunnerConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "submission-runner")]
#[command(about = "Watches a folder for submission archives and boots each project")]
pub struct CliConfig {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to watch, overrides [watch].dir
    #[arg(short, long)]
    pub watch_dir: Option<PathBuf>,

    /// Process a single archive and exit instead of watching
    #[arg(long, value_name = "ARCHIVE")]
    pub once: Option<PathBuf>,

    /// Print the rendered environment file and exit
    #[arg(long)]
    pub print_env: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl CliConfig {
    /// Loads the TOML file (if any) and applies command line overrides.
    pub fn load_runner_config(&self) -> Result<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::from_file(path)?,
            None => RunnerConfig::default(),
        };

        if let Some(dir) = &self.watch_dir {
            config.watch.dir = dir.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_watch_dir_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[watch]\ndir = \"/from/file\"\nextension = \"zip\"").unwrap();

        let cli = CliConfig::parse_from([
            "submission-runner",
            "--config",
            file.path().to_str().unwrap(),
            "--watch-dir",
            "/from/cli",
        ]);

        let config = cli.load_runner_config().unwrap();
        assert_eq!(config.watch.dir, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_no_config_file_means_defaults() {
        let cli = CliConfig::parse_from(["submission-runner"]);
        let config = cli.load_runner_config().unwrap();

        assert_eq!(config.watch.dir, PathBuf::from("."));
        assert!(cli.once.is_none());
    }
}
