//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//! 1. Built-in defaults
//! 2. `settings.toml` in the platform config directory (or `--config FILE`)
//! 3. `DUPFINDER_*` environment variables
//!
//! Command-line flags are applied on top by the caller.

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::actions::ActionPolicy;
use crate::duplicates::{ScanRequest, DEFAULT_POOL_SIZE};

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "DUPFINDER_";

const CONFIG_FILE: &str = "settings.toml";

/// Suffixes scanned in [`FileTypeMode::Normal`] unless configured otherwise.
pub const NORMAL_SUFFIXES: [&str; 7] = ["jpeg", "mov", "mp3", "mp4", "txt", "docx", "xlsx"];

/// Which files a scan considers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTypeMode {
    /// Every file regardless of suffix
    #[default]
    All,
    /// Only files whose suffix is in `normal_suffixes`
    Normal,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories scanned when none are given on the command line
    pub scan_folders: Vec<PathBuf>,
    /// Suffix filtering mode
    pub file_types: FileTypeMode,
    /// Allow-list used by [`FileTypeMode::Normal`]
    pub normal_suffixes: Vec<String>,
    /// What to do with confirmed duplicates
    pub action: ActionPolicy,
    /// Where the `finder/` journal and quarantine directory live (home by default)
    pub journal_root: Option<PathBuf>,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Worker threads
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_folders: Vec::new(),
            file_types: FileTypeMode::All,
            normal_suffixes: NORMAL_SUFFIXES.iter().map(|s| (*s).to_string()).collect(),
            action: ActionPolicy::Scan,
            journal_root: None,
            follow_symlinks: false,
            threads: DEFAULT_POOL_SIZE,
        }
    }
}

impl Config {
    /// Load from the default platform-specific path plus environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but is malformed.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                log::debug!("{}; using defaults and environment only", e);
                Self::figment(None).extract().context("Invalid configuration")
            }
        }
    }

    /// Load from an explicit file plus environment. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value has the wrong type.
    pub fn load_from(path: &Path) -> Result<Self> {
        log::debug!("Loading configuration from {}", path.display());
        Self::figment(Some(path))
            .extract()
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Save to the default platform-specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be determined or written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Cannot serialize configuration")?;
        fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))?;
        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns an error when no home directory can be determined.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "dupfinder", "dupfinder")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join(CONFIG_FILE))
    }

    /// Suffixes to scan; empty means unrestricted.
    #[must_use]
    pub fn suffixes(&self) -> &[String] {
        match self.file_types {
            FileTypeMode::All => &[],
            FileTypeMode::Normal => &self.normal_suffixes,
        }
    }

    /// Scan request for the configured folders.
    #[must_use]
    pub fn scan_request(&self) -> ScanRequest {
        ScanRequest::new(self.scan_folders.iter().cloned(), self.suffixes())
    }

    /// Journal root, defaulting to the user's home directory.
    #[must_use]
    pub fn journal_root(&self) -> PathBuf {
        self.journal_root.clone().unwrap_or_else(|| {
            BaseDirs::new()
                .map(|dirs| dirs.home_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }
}
