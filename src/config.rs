//! Configuration module for revdiff
//!
//! Loads user configuration from ~/.revdiff/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Number of context lines around changes (default 3)
    pub context_lines: u32,
    /// Where exports are written; relative paths resolve against the repo root
    pub export_dir: Option<PathBuf>,
    pub report_file: String,
    pub session_file: String,
    /// Refresh the diff when files in the work tree change
    pub watch: bool,
    /// Show the help banner and footer around the diff
    pub show_help: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context_lines: 3,
            export_dir: None,
            report_file: "review-report.md".to_string(),
            session_file: "review-session.json".to_string(),
            watch: true,
            show_help: true,
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Directory holding the config file and the log
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".revdiff")
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Log file used while the interactive view owns the terminal
    pub fn log_path() -> PathBuf {
        Self::config_dir().join("revdiff.log")
    }

    /// Merge CLI overrides into config
    pub fn with_overrides(mut self, context_lines: Option<u32>, export_dir: Option<PathBuf>) -> Self {
        if let Some(ctx) = context_lines {
            self.context_lines = ctx;
        }
        if export_dir.is_some() {
            self.export_dir = export_dir;
        }
        self
    }

    /// Resolve the export directory for a repository
    pub fn export_dir_for(&self, repo_root: &Path) -> PathBuf {
        match &self.export_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => repo_root.join(dir),
            None => repo_root.join(".review"),
        }
    }

    /// Report and session document paths for a repository
    pub fn export_paths(&self, repo_root: &Path) -> (PathBuf, PathBuf) {
        let dir = self.export_dir_for(repo_root);
        (dir.join(&self.report_file), dir.join(&self.session_file))
    }

    /// Create a default config file
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::default_path();
        Self::write_default(&config_path)?;
        Ok(config_path)
    }

    fn write_default(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(&Config::default()).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))
    }
}
