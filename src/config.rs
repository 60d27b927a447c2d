//! Configuration for auto-unstage
//!
//! Supports loading from `.auto-unstage.toml` (repo) or
//! `<config dir>/auto-unstage/config.toml` (global).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capture::stage::OperationKind;

/// Repo-local config file name
pub const REPO_CONFIG_FILE: &str = ".auto-unstage.toml";

/// Full configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AutoUnstageConfig {
    /// Staging settings
    pub staging: StagingConfig,

    /// Where marker state is kept
    pub store: StoreConfig,

    /// Output settings
    pub display: DisplayConfig,
}

/// Staging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Whether staging passes rewrite the index at all
    pub enabled: bool,

    /// Operation kinds that start a staging pass
    pub trigger_kinds: Vec<String>,

    /// Re-anchor marks against on-disk changes before staging
    pub sync_before_stage: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_kinds: vec!["add".to_string(), "commit".to_string()],
            sync_before_stage: true,
        }
    }
}

impl StagingConfig {
    /// Parsed trigger kinds
    pub fn operation_kinds(&self) -> Vec<OperationKind> {
        self.trigger_kinds
            .iter()
            .filter_map(|kind| kind.parse().ok())
            .collect()
    }
}

/// Marker store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for marker state, relative to the repository root
    pub dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: ".auto-unstage".to_string(),
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show editor-style 1-based line numbers
    pub one_based: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { one_based: true }
    }
}

impl AutoUnstageConfig {
    /// Load configuration from repo root, falling back to global config
    pub fn load(repo_root: &Path) -> Result<Self> {
        let repo_config = Self::repo_config_path(repo_root);
        if repo_config.exists() {
            return Self::load_from_file(&repo_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Global config path (`~/.config/auto-unstage/config.toml` on Linux)
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("auto-unstage").join("config.toml"))
    }

    /// Repo-local config path
    pub fn repo_config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(REPO_CONFIG_FILE)
    }

    /// Directory holding marker state for this repo
    pub fn store_dir(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.store.dir)
    }
}
