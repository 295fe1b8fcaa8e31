use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub location: PathBuf,
    #[serde(default = "repository_enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: u32,
}

/// Persisted list of configured repositories (`repositories.toml`).
#[derive(Debug, Clone)]
pub struct RepositoryStore {
    state_root: PathBuf,
}

impl RepositoryStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
        }
    }

    pub fn add_repository(&self, record: RepositoryRecord) -> Result<()> {
        validate_repository_name(&record.name)?;

        let mut state = self.load_state()?;
        if state
            .repositories
            .iter()
            .any(|existing| existing.name == record.name)
        {
            anyhow::bail!("repository '{}' already exists", record.name);
        }

        state.repositories.push(record);
        sort_repositories(&mut state.repositories);
        self.save_state(&state)
    }

    pub fn list_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        Ok(self.load_state()?.repositories)
    }

    pub fn remove_repository(&self, name: &str) -> Result<()> {
        let mut state = self.load_state()?;
        let before = state.repositories.len();
        state.repositories.retain(|record| record.name != name);
        if state.repositories.len() == before {
            anyhow::bail!("repository '{}' not found", name);
        }
        self.save_state(&state)
    }

    fn state_file_path(&self) -> PathBuf {
        self.state_root.join("repositories.toml")
    }

    fn load_state(&self) -> Result<RepositoryStateFile> {
        let path = self.state_file_path();
        if !path.exists() {
            return Ok(RepositoryStateFile::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed reading repository list: {}", path.display()))?;
        let mut state: RepositoryStateFile = toml::from_str(&content)
            .with_context(|| format!("failed parsing repository list: {}", path.display()))?;
        sort_repositories(&mut state.repositories);
        Ok(state)
    }

    fn save_state(&self, state: &RepositoryStateFile) -> Result<()> {
        fs::create_dir_all(&self.state_root).with_context(|| {
            format!(
                "failed creating repository state root: {}",
                self.state_root.display()
            )
        })?;

        let path = self.state_file_path();
        let content = toml::to_string(state)
            .with_context(|| format!("failed serializing repository list: {}", path.display()))?;
        fs::write(&path, content)
            .with_context(|| format!("failed writing repository list: {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RepositoryStateFile {
    #[serde(default = "state_file_version")]
    version: u32,
    #[serde(default)]
    repositories: Vec<RepositoryRecord>,
}

impl Default for RepositoryStateFile {
    fn default() -> Self {
        Self {
            version: state_file_version(),
            repositories: Vec::new(),
        }
    }
}

fn state_file_version() -> u32 {
    1
}

fn repository_enabled_default() -> bool {
    true
}

fn sort_repositories(repositories: &mut [RepositoryRecord]) {
    repositories.sort_by(|left, right| {
        left.priority
            .cmp(&right.priority)
            .then_with(|| left.name.cmp(&right.name))
    });
}

fn validate_repository_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 {
        anyhow::bail!("invalid repository name: '{name}'");
    }

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        anyhow::bail!("invalid repository name: '{name}'");
    };

    let first_is_valid = first.is_ascii_lowercase() || first.is_ascii_digit();
    let rest_is_valid =
        chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
    if !first_is_valid || !rest_is_valid {
        anyhow::bail!("invalid repository name: '{name}'");
    }

    Ok(())
}
