use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Initial working directory (defaults to the process directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_dir: Option<PathBuf>,

    /// Ask for an optional octal mode when creating a file (POSIX only)
    #[serde(default = "default_ask_mode_on_create")]
    pub ask_mode_on_create: bool,
}

fn default_ask_mode_on_create() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_dir: None,
            ask_mode_on_create: default_ask_mode_on_create(),
        }
    }
}

impl SessionConfig {
    /// `config.json` under the platform config dir, or the working directory
    /// when no home directory can be determined
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("org", "fileman", "fileman")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("fileman-config.json"))
    }

    /// Parse a config file. A relative `start_dir` is taken relative to the
    /// directory holding the file, not the process directory.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config JSON in {}", path.display()))?;

        if let (Some(dir), Some(base)) = (config.start_dir.as_mut(), path.parent()) {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        Ok(config)
    }

    /// Missing file means defaults; a file that exists must parse.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("no config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        tracing::info!("loading config from {}", path.display());
        let config = Self::load(path)?;
        if let Some(dir) = &config.start_dir {
            tracing::debug!("configured start dir: {}", dir.display());
        }
        Ok(config)
    }

    /// CLI flags take precedence over the file.
    pub fn with_start_dir(mut self, start_dir: Option<PathBuf>) -> Self {
        if start_dir.is_some() {
            self.start_dir = start_dir;
        }
        self
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))
    }
}
