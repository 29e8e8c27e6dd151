use crate::config::toml_config::ClassifyConfig;
use crate::domain::model::RoleAssignment;
use crate::utils::error::{IntakeError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

const API_TOKENS: [&str; 4] = ["api", "producer", "back-end", "backend"];

/// Folders that archiving tools add next to the real content.
const IGNORED_DIRS: [&str; 1] = ["__MACOSX"];

/// Upper bound on nested single-folder wrappers.
const MAX_WRAPPER_DEPTH: usize = 32;

/// The level of an extracted tree holding the two project folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoot {
    pub root: PathBuf,
    /// Number of single-folder wrappers descended through.
    pub depth: usize,
    pub folders: [String; 2],
}

/// Immediate subdirectory names of `dir`, sorted.
pub async fn list_subdirs(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if IGNORED_DIRS.contains(&name.as_str()) {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Descends through single-folder wrappers until a level with exactly two folders.
pub async fn resolve_project_root(dest: &Path) -> Result<ResolvedRoot> {
    let mut current = dest.to_path_buf();
    let mut depth = 0;

    loop {
        let mut folders = list_subdirs(&current).await?;
        match folders.len() {
            1 if depth < MAX_WRAPPER_DEPTH => {
                current.push(folders.remove(0));
                depth += 1;
            }
            2 => {
                let second = folders.remove(1);
                let first = folders.remove(0);
                tracing::debug!(
                    "Project root {} after {} wrapper(s)",
                    current.display(),
                    depth
                );
                return Ok(ResolvedRoot {
                    root: current,
                    depth,
                    folders: [first, second],
                });
            }
            found => {
                return Err(IntakeError::UnexpectedLayout {
                    dir: current,
                    found,
                })
            }
        }
    }
}

/// Recognizes the API/backend folder by name.
#[derive(Debug, Clone)]
pub struct RoleMatcher {
    pattern: Regex,
    override_name: Option<String>,
}

impl RoleMatcher {
    pub fn new(config: &ClassifyConfig) -> Result<Self> {
        let tokens: Vec<String> = API_TOKENS
            .iter()
            .map(|t| t.to_string())
            .chain(
                config
                    .extra_tokens
                    .iter()
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| regex::escape(t.trim())),
            )
            .collect();

        let pattern = Regex::new(&format!("(?i){}", tokens.join("|"))).map_err(|e| {
            IntakeError::InvalidConfigValue {
                field: "classify.extra_tokens".to_string(),
                value: config.extra_tokens.join(","),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            pattern,
            override_name: config.override_name.clone(),
        })
    }

    pub fn is_service_a(&self, name: &str) -> bool {
        self.pattern.is_match(name) || self.override_name.as_deref() == Some(name)
    }
}

/// Assigns service A to the one folder that matches; the other is service B.
pub fn classify_roles(folders: [&str; 2], matcher: &RoleMatcher) -> Result<RoleAssignment> {
    let [first, second] = folders;
    match (matcher.is_service_a(first), matcher.is_service_a(second)) {
        (true, false) => Ok(RoleAssignment {
            service_a: first.to_string(),
            service_b: second.to_string(),
        }),
        (false, true) => Ok(RoleAssignment {
            service_a: second.to_string(),
            service_b: first.to_string(),
        }),
        (a, b) => Err(IntakeError::ClassificationAmbiguous {
            candidates: vec![first.to_string(), second.to_string()],
            matched: usize::from(a) + usize::from(b),
        }),
    }
}
